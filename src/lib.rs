//! # roomcast
//!
//! `roomcast` is a real-time message broadcaster: whatever one connected
//! WebSocket client sends is delivered to every other connected client.
//! A slow or dead client is disconnected instead of holding up the room.
//!
//! ## Core Modules
//!
//! - `hub`: the single control loop owning membership and fan-out, plus the
//!   tracer it reports to.
//! - `client`: a participant's connection and the guard that releases it.
//! - `config`: loading and merging server configuration.
//! - `transport`: the WebSocket acceptor and the per-connection pumps.
//! - `utils`: error type and logging setup.

pub mod client;
pub mod config;
pub mod hub;
pub mod transport;
pub mod utils;
