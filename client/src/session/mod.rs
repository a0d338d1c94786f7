mod command;
mod handshake;
mod link;
mod open;
mod owner;
mod session_handle;
mod snapshots;
mod subscription;
mod writer;

pub(crate) use link::SessionLink;
pub use open::open_session;
pub use session_handle::Session;
pub use subscription::SubscriptionHandle;
