//! The `transport` module connects WebSocket clients to the hub.
//!
//! [`websocket`] accepts TCP connections, performs the HTTP upgrade and runs
//! each connection's lifecycle. [`pump`] holds the reader and writer loops
//! that move frames between a socket and the hub. [`identity`] reads the
//! opaque identity token from the upgrade request.

pub mod identity;
pub mod pump;
pub mod websocket;

pub use websocket::{serve, serve_connection, start_websocket_server};
