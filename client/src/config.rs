use std::{default::Default, path::PathBuf, time::Duration};

use mirror_shared::{Credentials, ObjectId, DEFAULT_MAX_FRAME_SIZE};

/// Contains Config properties which will be used by a Session
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Host name or address of the game server. Defaults to `127.0.0.1`.
    pub host: String,
    /// TCP port of the game server. Defaults to `47624`.
    pub port: u16,
    /// Sent in the handshake request
    pub credentials: Credentials,
    /// Deadline for opening the TCP stream. Defaults to 10 seconds.
    pub connect_timeout: Duration,
    /// Deadline for the handshake response. Defaults to 10 seconds.
    pub auth_timeout: Duration,
    /// Deadline for every request, including subscriptions. Defaults to 30 seconds.
    pub request_timeout: Duration,
    /// Number of definitions kept before least-recently-used eviction. Defaults to 1024.
    pub cache_capacity: usize,
    /// Largest frame accepted or sent. Defaults to 1 MiB.
    pub max_frame_size: usize,
    /// Objects subscribed immediately after the handshake
    pub bootstrap_subscriptions: Vec<ObjectId>,
    /// Named services, resolved through the handshake's service table, subscribed
    /// immediately after the handshake
    pub bootstrap_services: Vec<String>,
    /// Number of independent delivery lanes for listener callbacks. Defaults to 4.
    pub dispatcher_lanes: usize,
    /// Read-only definition bundle consulted before the network
    pub definition_bundle: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 47624,
            credentials: Credentials::default(),
            connect_timeout: Duration::from_secs(10),
            auth_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            cache_capacity: 1024,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            bootstrap_subscriptions: Vec::new(),
            bootstrap_services: Vec::new(),
            dispatcher_lanes: 4,
            definition_bundle: None,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn with_bootstrap_subscription(mut self, object_id: ObjectId) -> Self {
        self.bootstrap_subscriptions.push(object_id);
        self
    }

    pub fn with_bootstrap_service(mut self, service: impl Into<String>) -> Self {
        self.bootstrap_services.push(service.into());
        self
    }

    /// Values below 1 are raised to 1
    pub fn with_dispatcher_lanes(mut self, lanes: usize) -> Self {
        self.dispatcher_lanes = lanes.max(1);
        self
    }

    pub fn with_definition_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.definition_bundle = Some(path.into());
        self
    }

    pub(crate) fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
