pub mod applied_event;
pub mod error;
pub mod object;
pub mod registry;
pub mod subscriptions;
pub mod tracker;
