use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use log::warn;
use tokio::sync::{mpsc, oneshot, watch};

use mirror_shared::Value;

use super::command::Command;
use crate::{SessionError, SessionState};

/// Cloneable channel into the session owner task
#[derive(Clone)]
pub(crate) struct SessionLink {
    commands: mpsc::UnboundedSender<Command>,
    next_request_id: Arc<AtomicU32>,
    request_timeout: Duration,
    state: watch::Receiver<SessionState>,
}

impl SessionLink {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        request_timeout: Duration,
        state: watch::Receiver<SessionState>,
    ) -> Self {
        Self {
            commands,
            next_request_id: Arc::new(AtomicU32::new(1)),
            request_timeout,
            state,
        }
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub(crate) fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub(crate) fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Queues a command, refusing once the session is tearing down
    pub(crate) fn send(&self, command: Command) -> Result<(), SessionError> {
        if self.state().is_closed() {
            return Err(SessionError::SessionClosed);
        }
        self.commands
            .send(command)
            .map_err(|_| SessionError::SessionClosed)
    }

    /// Queues a command regardless of state; used for teardown itself
    pub(crate) fn send_unchecked(&self, command: Command) {
        let _ = self.commands.send(command);
    }

    /// Calls `service` and waits for its correlated response.
    ///
    /// Each call has its own deadline. Dropping the returned future abandons
    /// the request locally; nothing is sent to the server.
    pub(crate) async fn invoke(
        &self,
        service: &str,
        args: Vec<Value>,
    ) -> Result<Value, SessionError> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (responder, response) = oneshot::channel();
        self.send(Command::Invoke {
            request_id,
            service: service.to_string(),
            args,
            responder,
        })?;

        let mut guard = CancelGuard::new(self, Command::Forget { request_id });
        let outcome = tokio::time::timeout(self.request_timeout, response).await;
        match outcome {
            Ok(Ok(result)) => {
                guard.disarm();
                result
            }
            Ok(Err(_)) => {
                guard.disarm();
                Err(SessionError::SessionClosed)
            }
            Err(_) => {
                warn!(
                    "request {} to '{}' timed out after {:?}",
                    request_id, service, self.request_timeout
                );
                Err(SessionError::timeout(format!(
                    "response to request {} ('{}')",
                    request_id, service
                )))
            }
        }
    }
}

/// Sends its command to the owner when dropped while still armed
pub(crate) struct CancelGuard<'a> {
    link: &'a SessionLink,
    command: Option<Command>,
}

impl<'a> CancelGuard<'a> {
    pub(crate) fn new(link: &'a SessionLink, command: Command) -> Self {
        Self {
            link,
            command: Some(command),
        }
    }

    pub(crate) fn disarm(&mut self) {
        self.command = None;
    }
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        if let Some(command) = self.command.take() {
            self.link.send_unchecked(command);
        }
    }
}
