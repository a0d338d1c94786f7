pub mod auth;
pub mod definition;
pub mod event;
pub mod message;
pub mod message_kind;
