use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use futures::{SinkExt, StreamExt};
use log::{debug, info};
use tokio::{net::TcpListener, sync::mpsc, task::JoinHandle};
use tokio_util::codec::{FramedRead, FramedWrite};

use mirror_client::ClientConfig;
use mirror_shared::{
    AuthCode, AuthResponse, BootstrapData, BootstrapObject, Credentials, Definition, Message,
    ObjectEvent, ObjectId, ResourceId, Value, WireCodec, DEFINITION_SERVICE,
};

const EXPECT_WAIT: Duration = Duration::from_secs(2);

/// Answers one invocation. `None` leaves the request unanswered.
pub type ServiceHandler = Arc<dyn Fn(&[Value]) -> Option<Result<Value, String>> + Send + Sync>;

/// What the scripted server knows and how it behaves
pub struct ServerScript {
    username: String,
    password: String,
    bootstrap: BootstrapData,
    objects: HashMap<ObjectId, BootstrapObject>,
    services: HashMap<String, ServiceHandler>,
    definitions: HashMap<ResourceId, Definition>,
    silent_handshake: bool,
}

impl Default for ServerScript {
    fn default() -> Self {
        Self {
            username: "tester".to_string(),
            password: "secret".to_string(),
            bootstrap: BootstrapData {
                token: "token-1".to_string(),
                connection_id: 1,
                ..BootstrapData::default()
            },
            objects: HashMap::new(),
            services: HashMap::new(),
            definitions: HashMap::new(),
            silent_handshake: false,
        }
    }
}

impl ServerScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Granted in the handshake and resident from the start
    pub fn with_bootstrap_object(mut self, object: BootstrapObject) -> Self {
        self.bootstrap.objects.push(object);
        self
    }

    pub fn with_service_object(mut self, service: &str, object_id: ObjectId) -> Self {
        self.bootstrap
            .services
            .insert(service.to_string(), object_id);
        self
    }

    /// Available on request; `Subscribe` is answered with its snapshot
    pub fn with_object(mut self, object: BootstrapObject) -> Self {
        self.objects.insert(object.object_id, object);
        self
    }

    pub fn with_service<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&[Value]) -> Option<Result<Value, String>> + Send + Sync + 'static,
    {
        self.services.insert(name.to_string(), Arc::new(handler));
        self
    }

    pub fn with_definition(mut self, definition: Definition) -> Self {
        self.definitions.insert(definition.id.clone(), definition);
        self
    }

    /// Never answers the `AuthRequest`
    pub fn silent_handshake(mut self) -> Self {
        self.silent_handshake = true;
        self
    }
}

enum Control {
    Send(Message),
    Disconnect,
}

struct Shared {
    username: String,
    password: String,
    bootstrap: BootstrapData,
    objects: Mutex<HashMap<ObjectId, BootstrapObject>>,
    services: HashMap<String, ServiceHandler>,
    definitions: HashMap<ResourceId, Definition>,
    silent_handshake: bool,
    definition_requests: AtomicUsize,
}

/// Loopback server speaking the wire protocol to a single client
pub struct TestServer {
    port: u16,
    shared: Arc<Shared>,
    control: mpsc::UnboundedSender<Control>,
    received: mpsc::UnboundedReceiver<Message>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(script: ServerScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("could not bind test server");
        let port = listener
            .local_addr()
            .expect("test server has no address")
            .port();

        let shared = Arc::new(Shared {
            username: script.username,
            password: script.password,
            bootstrap: script.bootstrap,
            objects: Mutex::new(script.objects),
            services: script.services,
            definitions: script.definitions,
            silent_handshake: script.silent_handshake,
            definition_requests: AtomicUsize::new(0),
        });
        let (control, control_rx) = mpsc::unbounded_channel();
        let (received_tx, received) = mpsc::unbounded_channel();
        let task = tokio::spawn(serve(listener, shared.clone(), control_rx, received_tx));

        Self {
            port,
            shared,
            control,
            received,
            task,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Client configuration pointing at this server with short timeouts
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new("127.0.0.1", self.port)
            .with_credentials(Credentials::new("tester", "secret"))
            .with_connect_timeout(Duration::from_secs(1))
            .with_auth_timeout(Duration::from_millis(500))
            .with_request_timeout(Duration::from_millis(500))
    }

    pub fn push(&self, message: Message) {
        self.control
            .send(Control::Send(message))
            .expect("test server stopped");
    }

    pub fn push_event(&self, event: ObjectEvent) {
        self.push(Message::ObjectEvent(event));
    }

    /// Replaces the snapshot served for future `Subscribe` requests
    pub fn set_object(&self, object: BootstrapObject) {
        self.shared
            .objects
            .lock()
            .unwrap()
            .insert(object.object_id, object);
    }

    /// Drops the client's connection without a word
    pub fn disconnect(&self) {
        let _ = self.control.send(Control::Disconnect);
    }

    pub fn definition_requests(&self) -> usize {
        self.shared.definition_requests.load(Ordering::SeqCst)
    }

    /// Waits for the next client message matching `predicate`, skipping
    /// others; panics if none arrives in time
    pub async fn expect<F>(&mut self, predicate: F) -> Message
    where
        F: Fn(&Message) -> bool,
    {
        let deadline = tokio::time::Instant::now() + EXPECT_WAIT;
        loop {
            let message = tokio::time::timeout_at(deadline, self.received.recv())
                .await
                .expect("timed out waiting for a client message")
                .expect("test server stopped");
            if predicate(&message) {
                return message;
            }
        }
    }

    /// Messages the client sent that have not been examined yet
    pub fn drain_received(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(message) = self.received.try_recv() {
            messages.push(message);
        }
        messages
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    listener: TcpListener,
    shared: Arc<Shared>,
    mut control: mpsc::UnboundedReceiver<Control>,
    received: mpsc::UnboundedSender<Message>,
) {
    let (stream, address) = match listener.accept().await {
        Ok(accepted) => accepted,
        Err(error) => {
            debug!("test server accept failed: {}", error);
            return;
        }
    };
    info!("test server accepted {}", address);

    let codec = WireCodec::default();
    let (read_half, write_half) = stream.into_split();
    let mut reader = FramedRead::new(read_half, codec);
    let mut writer = FramedWrite::new(write_half, codec);

    loop {
        tokio::select! {
            biased;
            command = control.recv() => match command {
                Some(Control::Send(message)) => {
                    if writer.send(message).await.is_err() {
                        return;
                    }
                }
                Some(Control::Disconnect) | None => return,
            },
            inbound = reader.next() => {
                let Some(Ok(message)) = inbound else {
                    debug!("test server connection ended");
                    return;
                };
                let replies = answer(&shared, &message);
                let _ = received.send(message);
                for reply in replies {
                    if writer.send(reply).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

fn answer(shared: &Shared, message: &Message) -> Vec<Message> {
    match message {
        Message::AuthRequest { credentials } => {
            if shared.silent_handshake {
                return Vec::new();
            }
            let response = if credentials.username != shared.username {
                AuthResponse::Failure(AuthCode::NoSuchUser)
            } else if credentials.password != shared.password {
                AuthResponse::Failure(AuthCode::InvalidPassword)
            } else {
                AuthResponse::Success(shared.bootstrap.clone())
            };
            vec![Message::AuthResponse(response)]
        }
        Message::Invoke {
            request_id,
            service,
            args,
        } => {
            let result = if service == DEFINITION_SERVICE {
                shared.definition_requests.fetch_add(1, Ordering::SeqCst);
                let definition = args
                    .first()
                    .and_then(Value::as_str)
                    .and_then(|id| shared.definitions.get(id));
                Some(Ok(definition.map_or(Value::Null, Definition::to_value)))
            } else {
                match shared.services.get(service) {
                    Some(handler) => handler(args),
                    None => Some(Err(format!("unknown service '{}'", service))),
                }
            };
            result
                .map(|result| Message::Response {
                    request_id: *request_id,
                    result,
                })
                .into_iter()
                .collect()
        }
        Message::Subscribe { object_id } => {
            let objects = shared.objects.lock().unwrap();
            match objects.get(object_id) {
                Some(object) => vec![Message::ObjectEvent(object.to_event())],
                None => vec![Message::SubscribeFailed {
                    object_id: *object_id,
                    message: "no such object".to_string(),
                }],
            }
        }
        Message::Ping { nonce } => vec![Message::Pong { nonce: *nonce }],
        _ => Vec::new(),
    }
}
