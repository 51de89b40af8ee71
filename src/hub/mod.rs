//! The `hub` module owns room membership and message fan-out.
//!
//! All membership changes and broadcasts go through one control loop
//! ([`Hub::run`]) reached only through [`HubHandle`]. The membership map is
//! never shared, so no lock guards it: the loop handles one Join, Leave or
//! Publish at a time.
//!
//! ```text
//! HubHandle::join ────┐
//! HubHandle::leave ───┼──► Hub::run ──► try_send ──► member outbound queues
//! HubHandle::publish ─┘        │
//!                              └──► Tracer
//! ```

pub mod command;
pub mod engine;
pub mod handle;
pub mod tracer;

pub use command::{Control, Join, LeaveReason, Publish};
pub use engine::Hub;
pub use handle::HubHandle;
pub use tracer::{LogTracer, Off, TraceEvent, Tracer, WriterTracer, from_target};

#[cfg(test)]
mod tests;
