//! Layered configuration: built-in defaults, then an optional
//! `config/default.{toml,yaml,json}` file, then the environment.
//!
//! Environment keys are prefixed with `ROOMCAST` and nested with `__`,
//! e.g. `ROOMCAST__HUB__MESSAGE_BUFFER_SIZE=64`. A bare `PORT` variable
//! overrides the listening port.

mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{HubSettings, ServerSettings, Settings, TraceTarget, TransportSettings};

/// Loads the configuration from the default file and environment variables
/// and merges it onto `Settings::default()`.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("ROOMCAST")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("server.port", std::env::var("PORT").ok())?;

    let config = builder.build()?;

    let partial: PartialSettings = config.try_deserialize()?;

    let default = Settings::default();

    Ok(Settings {
        server: ServerSettings {
            host: partial
                .server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: partial
                .server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
        },
        hub: HubSettings {
            message_buffer_size: partial
                .hub
                .as_ref()
                .and_then(|h| h.message_buffer_size)
                .unwrap_or(default.hub.message_buffer_size)
                .max(1),
            echo_to_sender: partial
                .hub
                .as_ref()
                .and_then(|h| h.echo_to_sender)
                .unwrap_or(default.hub.echo_to_sender),
            trace: partial
                .hub
                .as_ref()
                .and_then(|h| h.trace)
                .unwrap_or(default.hub.trace),
        },
        transport: TransportSettings {
            socket_buffer_size: partial
                .transport
                .as_ref()
                .and_then(|t| t.socket_buffer_size)
                .unwrap_or(default.transport.socket_buffer_size),
        },
    })
}
