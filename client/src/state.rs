/// Lifecycle of a session.
///
/// Runs `Disconnected -> Connecting -> Authenticating -> Ready -> Disconnecting
/// -> Disconnected`; a fatal error jumps straight to teardown from any state.
/// A disconnected session is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
    Disconnecting,
}

impl SessionState {
    pub fn is_ready(&self) -> bool {
        *self == SessionState::Ready
    }

    /// Whether the session has started or finished tearing down
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            SessionState::Disconnecting | SessionState::Disconnected
        )
    }
}
