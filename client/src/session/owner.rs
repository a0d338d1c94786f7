use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
    time::Duration,
};

use futures::StreamExt;
use log::{debug, error, info, trace, warn};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};

use mirror_shared::{
    AppliedEvent, BootstrapData, Message, ObjectEvent, ObjectEventKind, ObjectId, ObjectRegistry,
    ObjectSnapshot, RegistryError, RequestId, ServiceId, SubscriberHandle, Value,
};

use super::{
    command::Command,
    handshake::FrameReader,
    snapshots::{write_snapshots, SnapshotTable},
};
use crate::{
    dispatcher::Dispatcher, ClientConfig, DefinitionCache, NotificationListener, ObjectListener,
    SessionError, SessionEvent, SessionState, SubscriptionHandle,
};

// Upper bound on flushing queued frames (the Logoff included) at teardown
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const DISPATCH_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

struct PendingInvoke {
    service: ServiceId,
    responder: oneshot::Sender<Result<Value, SessionError>>,
}

struct PendingSubscription {
    subscriber: SubscriberHandle,
    responder: oneshot::Sender<Result<SubscriptionHandle, SessionError>>,
}

enum Teardown {
    Requested,
    Failed(SessionError),
}

/// The task that owns the session: the only reader of the transport and the
/// only writer of the registry.
pub(crate) struct SessionOwner {
    registry: ObjectRegistry,
    listeners: HashMap<SubscriberHandle, Arc<dyn ObjectListener>>,
    notification_listeners: Vec<Arc<dyn NotificationListener>>,
    pending_requests: HashMap<RequestId, PendingInvoke>,
    pending_subscriptions: HashMap<ObjectId, Vec<PendingSubscription>>,
    dispatcher: Dispatcher,
    outbound: mpsc::UnboundedSender<Message>,
    snapshots: SnapshotTable,
    state: watch::Sender<SessionState>,
    definitions: Arc<DefinitionCache>,
    writer_task: JoinHandle<()>,
}

impl SessionOwner {
    pub(crate) fn new(
        config: &ClientConfig,
        definitions: Arc<DefinitionCache>,
        outbound: mpsc::UnboundedSender<Message>,
        snapshots: SnapshotTable,
        state: watch::Sender<SessionState>,
        writer_task: JoinHandle<()>,
    ) -> Self {
        Self {
            registry: ObjectRegistry::with_tracker(definitions.clone()),
            listeners: HashMap::new(),
            notification_listeners: Vec::new(),
            pending_requests: HashMap::new(),
            pending_subscriptions: HashMap::new(),
            dispatcher: Dispatcher::new(config.dispatcher_lanes),
            outbound,
            snapshots,
            state,
            definitions,
            writer_task,
        }
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("session state {:?} -> {:?}", previous, state);
        }
    }

    /// Installs the handshake's objects and requests the configured
    /// bootstrap subscriptions
    pub(crate) fn install_bootstrap(
        &mut self,
        bootstrap: &BootstrapData,
        config: &ClientConfig,
    ) -> Result<(), SessionError> {
        for object in &bootstrap.objects {
            self.registry.retain_object(object.object_id);
            match self.registry.apply(object.to_event()) {
                Ok(applied) => {
                    let event = SessionEvent::from_applied(applied);
                    self.publish(&event);
                    self.prefetch_references(event.snapshot());
                }
                Err(error) => warn!("skipping bootstrap object {}: {}", object.object_id, error),
            }
        }

        let mut targets = config.bootstrap_subscriptions.clone();
        for service in &config.bootstrap_services {
            match bootstrap.service_object(service) {
                Some(object_id) => targets.push(object_id),
                None => warn!("handshake names no object for service '{}'", service),
            }
        }
        for object_id in targets {
            self.registry.retain_object(object_id);
            if self.registry.contains(object_id) {
                continue;
            }
            debug!("requesting bootstrap subscription to object {}", object_id);
            self.send(Message::Subscribe { object_id })?;
        }
        Ok(())
    }

    pub(crate) async fn run(
        mut self,
        mut reader: FrameReader,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        let teardown = loop {
            tokio::select! {
                inbound = reader.next() => {
                    let result = match inbound {
                        Some(Ok(message)) => self.handle_message(message),
                        Some(Err(error)) => Err(SessionError::from(error)),
                        None => Err(SessionError::Connection {
                            reason: "server closed the connection".to_string(),
                        }),
                    };
                    if let Err(error) = result {
                        break Teardown::Failed(error);
                    }
                }
                command = commands.recv() => match command {
                    Some(Command::Close) | None => break Teardown::Requested,
                    Some(command) => {
                        if let Err(error) = self.handle_command(command) {
                            break Teardown::Failed(error);
                        }
                    }
                },
            }
        };
        drop(reader);
        self.teardown(teardown).await;
    }

    // Inbound

    fn handle_message(&mut self, message: Message) -> Result<(), SessionError> {
        trace!("received {:?}", message.kind());
        match message {
            Message::Response { request_id, result } => {
                match self.pending_requests.remove(&request_id) {
                    Some(pending) => {
                        trace!("request {} to '{}' answered", request_id, pending.service);
                        let result = result.map_err(|message| SessionError::Remote { message });
                        let _ = pending.responder.send(result);
                    }
                    None => warn!("response for unknown or expired request {}", request_id),
                }
                Ok(())
            }
            Message::ObjectEvent(event) => {
                self.handle_object_event(event);
                Ok(())
            }
            Message::Notification { name, payload } => {
                self.dispatcher
                    .notify(self.notification_listeners.clone(), name, payload);
                Ok(())
            }
            Message::SubscribeFailed { object_id, message } => {
                self.handle_subscribe_failed(object_id, message);
                Ok(())
            }
            Message::Error { message } => Err(SessionError::Remote { message }),
            Message::Ping { nonce } => self.send(Message::Pong { nonce }),
            Message::Pong { nonce } => {
                trace!("pong {}", nonce);
                Ok(())
            }
            Message::AuthResponse(_)
            | Message::AuthRequest { .. }
            | Message::Invoke { .. }
            | Message::Subscribe { .. }
            | Message::Unsubscribe { .. }
            | Message::Logoff => {
                warn!("ignoring unexpected {:?} from server", message.kind());
                Ok(())
            }
        }
    }

    fn handle_object_event(&mut self, event: ObjectEvent) {
        let object_id = event.object_id;
        let is_snapshot = matches!(event.kind, ObjectEventKind::Added { .. });
        if is_snapshot
            && !self.registry.contains(object_id)
            && self.registry.subscriber_count(object_id) == 0
            && !self.registry.is_retained(object_id)
        {
            warn!("ignoring unsolicited snapshot of object {}", object_id);
            return;
        }

        let kind = event.kind.name();
        match self.registry.apply(event) {
            Ok(applied) => self.deliver(applied),
            Err(RegistryError::ObjectNotFound { .. }) => {
                warn!("ignoring {} for unknown object {}", kind, object_id);
            }
            Err(error @ RegistryError::MissingUpdate { .. }) if error.is_gap() => {
                warn!("{}; requesting a fresh snapshot", error);
                self.registry.mark_desynchronized(object_id);
                if let Err(error) = self.send(Message::Subscribe { object_id }) {
                    warn!("could not request resync of object {}: {}", object_id, error);
                }
            }
            Err(error @ RegistryError::MissingUpdate { .. }) => {
                warn!("discarding stale {}: {}", kind, error);
            }
            Err(RegistryError::Desynchronized { .. }) => {
                debug!(
                    "dropping {} for object {} while awaiting its snapshot",
                    kind, object_id
                );
            }
            Err(error) => warn!("rejected {}: {}", kind, error),
        }
    }

    fn deliver(&mut self, applied: AppliedEvent) {
        let object_id = applied.object_id();
        let mut abandoned = Vec::new();
        let (event, listeners) = match applied {
            AppliedEvent::Removed {
                snapshot,
                subscribers,
            } => {
                debug!("object {} revoked by server", object_id);
                let listeners = self.take_listeners(&subscribers);
                self.fail_pending_subscriptions(object_id, "object was revoked");
                let event = SessionEvent::ObjectRevoked {
                    snapshot: Arc::new(snapshot),
                };
                (event, listeners)
            }
            applied => {
                let completes_subscriptions = matches!(
                    applied,
                    AppliedEvent::Added { .. } | AppliedEvent::Resynchronized { .. }
                );
                let event = SessionEvent::from_applied(applied);
                self.prefetch_references(event.snapshot());
                if completes_subscriptions {
                    abandoned = self.complete_pending_subscriptions(object_id);
                }
                let handles = self.registry.subscribers(object_id);
                let listeners = self.listeners_for(&handles);
                (event, listeners)
            }
        };

        self.publish(&event);
        self.dispatcher.dispatch(object_id, listeners, event);

        for subscriber in abandoned {
            if let Err(error) = self.unsubscribe(subscriber) {
                warn!("could not release abandoned subscription: {}", error);
            }
        }
    }

    fn handle_subscribe_failed(&mut self, object_id: ObjectId, message: String) {
        if self.registry.contains(object_id) {
            // a refused resync leaves no way to recover the object
            warn!(
                "server refused to resynchronize object {}: {}",
                object_id, message
            );
            let version = self.registry.version(object_id).unwrap_or_default();
            self.handle_object_event(ObjectEvent::removed(object_id, version));
            return;
        }

        warn!("subscription to object {} failed: {}", object_id, message);
        let waiting = self
            .pending_subscriptions
            .remove(&object_id)
            .unwrap_or_default();
        for pending in waiting {
            self.listeners.remove(&pending.subscriber);
            let _ = pending.responder.send(Err(SessionError::SubscriptionFailed {
                object_id,
                message: message.clone(),
            }));
        }
        for subscriber in self.registry.drop_subscribers(object_id) {
            self.listeners.remove(&subscriber);
        }
    }

    // Commands

    fn handle_command(&mut self, command: Command) -> Result<(), SessionError> {
        match command {
            Command::Invoke {
                request_id,
                service,
                args,
                responder,
            } => {
                if responder.is_closed() {
                    return Ok(());
                }
                trace!("request {} to '{}'", request_id, service);
                self.pending_requests.insert(
                    request_id,
                    PendingInvoke {
                        service: service.clone(),
                        responder,
                    },
                );
                self.send(Message::Invoke {
                    request_id,
                    service,
                    args,
                })
            }
            Command::Forget { request_id } => {
                if self.pending_requests.remove(&request_id).is_some() {
                    debug!("request {} abandoned by caller", request_id);
                }
                Ok(())
            }
            Command::Subscribe {
                object_id,
                listener,
                responder,
            } => self.subscribe(object_id, listener, responder),
            Command::AbandonSubscribe { object_id } => self.prune_abandoned(object_id),
            Command::Unsubscribe { handle, responder } => {
                let result = self.unsubscribe(handle.subscriber());
                let _ = responder.send(());
                result
            }
            Command::AddNotificationListener { listener } => {
                self.notification_listeners.push(listener);
                Ok(())
            }
            Command::Rejected { request_id, error } => {
                if let Some(pending) =
                    request_id.and_then(|request_id| self.pending_requests.remove(&request_id))
                {
                    let _ = pending.responder.send(Err(SessionError::InvalidRequest {
                        reason: error.to_string(),
                    }));
                }
                Ok(())
            }
            Command::TransportFailed { error } => Err(error),
            // handled by the run loop
            Command::Close => Ok(()),
        }
    }

    fn subscribe(
        &mut self,
        object_id: ObjectId,
        listener: Arc<dyn ObjectListener>,
        responder: oneshot::Sender<Result<SubscriptionHandle, SessionError>>,
    ) -> Result<(), SessionError> {
        let subscriber = self.registry.subscribe(object_id);
        self.listeners.insert(subscriber, listener.clone());
        let handle = SubscriptionHandle::new(object_id, subscriber);

        if let Some(snapshot) = self.registry.get(object_id) {
            if responder.send(Ok(handle)).is_err() {
                return self.unsubscribe(subscriber);
            }
            self.dispatcher.dispatch(
                object_id,
                vec![listener],
                SessionEvent::ObjectAvailable {
                    snapshot: Arc::new(snapshot),
                },
            );
            return Ok(());
        }

        let waiting = self.pending_subscriptions.entry(object_id).or_default();
        let first = waiting.is_empty();
        waiting.push(PendingSubscription {
            subscriber,
            responder,
        });
        if first {
            debug!("requesting subscription to object {}", object_id);
            self.send(Message::Subscribe { object_id })?;
        }
        Ok(())
    }

    fn unsubscribe(&mut self, subscriber: SubscriberHandle) -> Result<(), SessionError> {
        self.listeners.remove(&subscriber);
        let released = match self.registry.unsubscribe(subscriber) {
            Ok(released) => released,
            Err(error) => {
                debug!("{}", error);
                return Ok(());
            }
        };
        let Some(object_id) = released else {
            return Ok(());
        };

        if let Some(waiting) = self.pending_subscriptions.get_mut(&object_id) {
            waiting.retain(|pending| pending.subscriber != subscriber);
            if waiting.is_empty() {
                self.pending_subscriptions.remove(&object_id);
            }
        }
        write_snapshots(&self.snapshots).remove(&object_id);
        debug!("released object {}, unsubscribing", object_id);
        self.send(Message::Unsubscribe { object_id })
    }

    fn prune_abandoned(&mut self, object_id: ObjectId) -> Result<(), SessionError> {
        let Some(waiting) = self.pending_subscriptions.get_mut(&object_id) else {
            return Ok(());
        };
        let (abandoned, still_waiting): (Vec<_>, Vec<_>) = waiting
            .drain(..)
            .partition(|pending| pending.responder.is_closed());
        *waiting = still_waiting;
        if waiting.is_empty() {
            self.pending_subscriptions.remove(&object_id);
        }
        for pending in abandoned {
            debug!("subscription {:?} abandoned by caller", pending.subscriber);
            self.unsubscribe(pending.subscriber)?;
        }
        Ok(())
    }

    /// Hands out handles to everyone waiting on `object_id`; returns the
    /// subscribers whose callers already gave up
    fn complete_pending_subscriptions(&mut self, object_id: ObjectId) -> Vec<SubscriberHandle> {
        let mut abandoned = Vec::new();
        let Some(waiting) = self.pending_subscriptions.remove(&object_id) else {
            return abandoned;
        };
        for pending in waiting {
            let handle = SubscriptionHandle::new(object_id, pending.subscriber);
            if pending.responder.send(Ok(handle)).is_err() {
                debug!("subscription {:?} completed after its caller left", handle);
                self.listeners.remove(&pending.subscriber);
                abandoned.push(pending.subscriber);
            }
        }
        abandoned
    }

    fn fail_pending_subscriptions(&mut self, object_id: ObjectId, message: &str) {
        for pending in self
            .pending_subscriptions
            .remove(&object_id)
            .unwrap_or_default()
        {
            self.listeners.remove(&pending.subscriber);
            let _ = pending.responder.send(Err(SessionError::SubscriptionFailed {
                object_id,
                message: message.to_string(),
            }));
        }
    }

    // Helpers

    fn send(&self, message: Message) -> Result<(), SessionError> {
        self.outbound
            .send(message)
            .map_err(|_| SessionError::Connection {
                reason: "transport writer has stopped".to_string(),
            })
    }

    fn publish(&self, event: &SessionEvent) {
        let mut snapshots = write_snapshots(&self.snapshots);
        match event {
            SessionEvent::ObjectRevoked { .. } => {
                snapshots.remove(&event.object_id());
            }
            _ => {
                snapshots.insert(event.object_id(), event.snapshot().clone());
            }
        }
    }

    fn prefetch_references(&self, snapshot: &ObjectSnapshot) {
        let mut references = BTreeSet::new();
        for value in snapshot.fields().values() {
            value.collect_refs(&mut references);
        }
        for resource_id in references {
            self.definitions.prefetch(&resource_id);
        }
    }

    fn listeners_for(&self, handles: &[SubscriberHandle]) -> Vec<Arc<dyn ObjectListener>> {
        handles
            .iter()
            .filter_map(|handle| self.listeners.get(handle).cloned())
            .collect()
    }

    fn take_listeners(&mut self, handles: &[SubscriberHandle]) -> Vec<Arc<dyn ObjectListener>> {
        handles
            .iter()
            .filter_map(|handle| self.listeners.remove(handle))
            .collect()
    }

    // Teardown

    async fn teardown(mut self, teardown: Teardown) {
        self.set_state(SessionState::Disconnecting);
        match teardown {
            Teardown::Requested => {
                info!("closing session");
                let _ = self.outbound.send(Message::Logoff);
            }
            Teardown::Failed(error) => error!("session failed: {}", error),
        }

        for (_, pending) in self.pending_requests.drain() {
            let _ = pending.responder.send(Err(SessionError::SessionClosed));
        }
        for (_, waiting) in self.pending_subscriptions.drain() {
            for pending in waiting {
                let _ = pending.responder.send(Err(SessionError::SessionClosed));
            }
        }

        write_snapshots(&self.snapshots).clear();
        for (snapshot, handles) in self.registry.clear() {
            let object_id = snapshot.object_id();
            let listeners = self.take_listeners(&handles);
            self.dispatcher.dispatch(
                object_id,
                listeners,
                SessionEvent::ObjectRevoked {
                    snapshot: Arc::new(snapshot),
                },
            );
        }
        self.listeners.clear();
        self.notification_listeners.clear();

        let Self {
            dispatcher,
            outbound,
            writer_task,
            state,
            ..
        } = self;
        drop(outbound);
        match tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer_task).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => warn!("transport writer ended abnormally: {}", error),
            Err(_) => warn!("transport writer did not drain within {:?}", WRITER_DRAIN_TIMEOUT),
        }
        dispatcher.shutdown(DISPATCH_DRAIN_TIMEOUT).await;

        state.send_replace(SessionState::Disconnected);
        info!("session disconnected");
    }
}
