use thiserror::Error;

use mirror_shared::{AuthCode, CodecError, ObjectId};

use crate::DefinitionError;

/// Errors surfaced by session operations
///
/// `Connection`, `MalformedFrame` and `Authentication` end the session; every
/// pending request then fails with `SessionClosed`. `Timeout` is fatal only
/// for the operation that timed out, except during the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Transport-level failure
    #[error("Connection error: {reason}")]
    Connection { reason: String },

    /// The inbound stream could not be decoded and is no longer trusted
    #[error("Malformed frame from server: {0}")]
    MalformedFrame(CodecError),

    /// The server rejected the handshake
    #[error("Authentication rejected: {code}")]
    Authentication { code: AuthCode },

    /// An operation exceeded its deadline
    #[error("Timed out waiting for {operation}")]
    Timeout { operation: String },

    /// The session is disconnecting or disconnected
    #[error("Session is closed")]
    SessionClosed,

    /// The server refused a subscription
    #[error("Subscription to object {object_id} failed: {message}")]
    SubscriptionFailed { object_id: ObjectId, message: String },

    /// A service call returned an error, or the server ended the session with one
    #[error("Server error: {message}")]
    Remote { message: String },

    /// The request could not be put on the wire; the session is unaffected
    #[error("Request could not be sent: {reason}")]
    InvalidRequest { reason: String },

    /// A definition could not be resolved
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

impl SessionError {
    pub(crate) fn timeout(operation: impl Into<String>) -> Self {
        SessionError::Timeout {
            operation: operation.into(),
        }
    }

    /// Whether this error ended the whole session rather than one operation
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Connection { .. }
                | SessionError::MalformedFrame(_)
                | SessionError::Authentication { .. }
                | SessionError::SessionClosed
        )
    }
}

impl From<CodecError> for SessionError {
    fn from(error: CodecError) -> Self {
        if error.is_malformed() {
            SessionError::MalformedFrame(error)
        } else {
            SessionError::Connection {
                reason: error.to_string(),
            }
        }
    }
}

impl From<std::io::Error> for SessionError {
    fn from(error: std::io::Error) -> Self {
        SessionError::Connection {
            reason: error.to_string(),
        }
    }
}
