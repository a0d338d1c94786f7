//! # Mirror Client
//! A headless game client. It keeps one authenticated TCP session to a game
//! server and mirrors the server-owned objects it subscribes to, delivering
//! their changes to listeners in order.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use mirror_shared::{
    AuthCode, BootstrapData, BootstrapObject, Credentials, Definition, FieldChange, ObjectId,
    ObjectSnapshot, ResourceId, Value,
};

mod config;
mod definitions;
mod dispatcher;
mod error;
mod events;
mod session;
mod state;

pub use config::ClientConfig;
pub(crate) use definitions::network::NetworkSource;
pub use definitions::{
    bundle::BundleSource, cache::DefinitionCache, error::DefinitionError,
    source::DefinitionSource, stats::CacheStats,
};
pub use error::SessionError;
pub use events::{ListenerError, NotificationListener, ObjectListener, SessionEvent};
pub use session::{open_session, Session, SubscriptionHandle};
pub use state::SessionState;
