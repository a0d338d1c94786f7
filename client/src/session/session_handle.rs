use std::sync::Arc;

use log::warn;
use tokio::sync::{oneshot, watch};

use mirror_shared::{BootstrapData, Definition, ObjectId, ObjectSnapshot, Value};

use super::{
    command::Command,
    link::{CancelGuard, SessionLink},
    snapshots::{read_snapshots, SnapshotTable},
};
use crate::{
    DefinitionCache, NotificationListener, ObjectListener, SessionError, SessionState,
    SubscriptionHandle,
};

/// A live, authenticated session.
///
/// Every method takes `&self`, so a session can be shared between tasks
/// behind an `Arc`. Dropping the last handle closes the session.
pub struct Session {
    link: SessionLink,
    snapshots: SnapshotTable,
    definitions: Arc<DefinitionCache>,
    bootstrap: Arc<BootstrapData>,
}

impl Session {
    pub(crate) fn new(
        link: SessionLink,
        snapshots: SnapshotTable,
        definitions: Arc<DefinitionCache>,
        bootstrap: BootstrapData,
    ) -> Self {
        Self {
            link,
            snapshots,
            definitions,
            bootstrap: Arc::new(bootstrap),
        }
    }

    /// Calls a server-side service and waits for its result.
    ///
    /// Fails with `Timeout` after the configured request timeout without
    /// affecting other requests, with `Remote` when the service reports an
    /// error, and with `SessionClosed` once the session is gone.
    pub async fn invoke(&self, service: &str, args: Vec<Value>) -> Result<Value, SessionError> {
        self.link.invoke(service, args).await
    }

    /// Subscribes `listener` to an object, waiting for the server to grant it
    /// when it is not resident yet. The listener's first event is always
    /// `ObjectAvailable`.
    pub async fn subscribe<L>(
        &self,
        object_id: ObjectId,
        listener: L,
    ) -> Result<SubscriptionHandle, SessionError>
    where
        L: ObjectListener + 'static,
    {
        self.subscribe_shared(object_id, Arc::new(listener)).await
    }

    /// Like `subscribe`, for a listener shared between several objects
    pub async fn subscribe_shared(
        &self,
        object_id: ObjectId,
        listener: Arc<dyn ObjectListener>,
    ) -> Result<SubscriptionHandle, SessionError> {
        let (responder, granted) = oneshot::channel();
        self.link.send(Command::Subscribe {
            object_id,
            listener,
            responder,
        })?;

        let mut guard = CancelGuard::new(&self.link, Command::AbandonSubscribe { object_id });
        let outcome = tokio::time::timeout(self.link.request_timeout(), granted).await;
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
                warn!("subscription to object {} timed out", object_id);
                Err(SessionError::timeout(format!(
                    "subscription to object {}",
                    object_id
                )))
            }
        }
    }

    /// Ends one subscription. The object is released (and the server told)
    /// when this was its last subscriber and it was not part of the bootstrap.
    pub async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), SessionError> {
        let (responder, done) = oneshot::channel();
        self.link.send(Command::Unsubscribe { handle, responder })?;
        done.await.map_err(|_| SessionError::SessionClosed)
    }

    /// Latest snapshot of a resident object
    pub fn get(&self, object_id: ObjectId) -> Result<Option<Arc<ObjectSnapshot>>, SessionError> {
        if self.state().is_closed() {
            return Err(SessionError::SessionClosed);
        }
        Ok(read_snapshots(&self.snapshots).get(&object_id).cloned())
    }

    /// Resolves a definition through the session's cache
    pub async fn resolve_definition(
        &self,
        resource_id: &str,
    ) -> Result<Arc<Definition>, SessionError> {
        Ok(self.definitions.resolve(resource_id).await?)
    }

    pub fn definitions(&self) -> &DefinitionCache {
        &self.definitions
    }

    pub fn on_notification<L>(&self, listener: L) -> Result<(), SessionError>
    where
        L: NotificationListener + 'static,
    {
        self.link.send(Command::AddNotificationListener {
            listener: Arc::new(listener),
        })
    }

    pub fn state(&self) -> SessionState {
        self.link.state()
    }

    /// Receiver that observes every lifecycle transition
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.link.state_changes()
    }

    /// What the server handed over in the handshake
    pub fn bootstrap(&self) -> &BootstrapData {
        &self.bootstrap
    }

    /// Sends `Logoff`, fails every pending operation with `SessionClosed`,
    /// revokes every object, and waits until the session is `Disconnected`.
    /// Closing a closed session does nothing.
    pub async fn close(&self) {
        self.link.send_unchecked(Command::Close);
        let mut state = self.link.state_changes();
        let _ = state
            .wait_for(|state| *state == SessionState::Disconnected)
            .await;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.state().is_closed() {
            self.link.send_unchecked(Command::Close);
        }
    }
}
