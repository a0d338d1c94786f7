pub mod bundle;
pub mod cache;
pub mod error;
pub mod network;
pub mod source;
pub mod stats;
