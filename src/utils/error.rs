//! The `error` module defines the error type shared across `roomcast`.
//!
//! Every failure is local to one connection or to server start-up. None of
//! them is ever escalated to the hub: a broken connection surfaces to the
//! rest of the system only as a membership change.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP upgrade did not yield a WebSocket stream.
    #[error("websocket upgrade failed: {0}")]
    Upgrade(#[source] tungstenite::Error),

    #[error("transport read failed: {0}")]
    Read(#[source] tungstenite::Error),

    #[error("transport write failed: {0}")]
    Write(#[source] tungstenite::Error),

    /// The writer task panicked or was aborted.
    #[error("writer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The hub control loop is no longer running.
    #[error("hub is closed")]
    HubClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
