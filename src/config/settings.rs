use serde::Deserialize;

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub hub: HubSettings,
    pub transport: TransportSettings,
}

/// Where the server binds.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Hub behaviour.
///
/// `message_buffer_size` is the capacity of each connection's outbound
/// queue. A member whose queue is full when a message is fanned out is
/// evicted.
#[derive(Debug, Deserialize, Clone)]
pub struct HubSettings {
    pub message_buffer_size: usize,
    /// Whether a publisher receives its own messages.
    pub echo_to_sender: bool,
    pub trace: TraceTarget,
}

/// WebSocket transport tuning.
#[derive(Debug, Deserialize, Clone)]
pub struct TransportSettings {
    pub socket_buffer_size: usize,
}

/// Which sink the hub reports its lifecycle events to.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TraceTarget {
    #[default]
    Off,
    /// Plain text lines on stdout.
    Stdout,
    /// JSON lines on stdout.
    Json,
    /// `tracing` events at debug level.
    Log,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub hub: Option<PartialHubSettings>,
    pub transport: Option<PartialTransportSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialHubSettings {
    pub message_buffer_size: Option<usize>,
    pub echo_to_sender: Option<bool>,
    pub trace: Option<TraceTarget>,
}

#[derive(Debug, Deserialize)]
pub struct PartialTransportSettings {
    pub socket_buffer_size: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            hub: HubSettings::default(),
            transport: TransportSettings::default(),
        }
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            message_buffer_size: 256,
            echo_to_sender: true,
            trace: TraceTarget::Off,
        }
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            socket_buffer_size: 1024,
        }
    }
}

impl Settings {
    /// Address the server listens on, as `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
