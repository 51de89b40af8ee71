//! # Tracer: observability side-channel of the hub.
//!
//! The hub reports what it does to a [`Tracer`]. Tracing never influences
//! membership or delivery; a sink that does nothing ([`Off`]) is the
//! default.
//!
//! ## Example output ([`WriterTracer`])
//! ```text
//! 2026-10-15T09:12:03.120Z member joined: conn-3f2a… (members=2)
//! 2026-10-15T09:12:04.501Z message received from conn-3f2a…: 5 bytes
//! 2026-10-15T09:12:04.501Z  -- delivered to conn-91bc…
//! 2026-10-15T09:12:04.502Z  -- delivery failed, evicting conn-77d0…
//! 2026-10-15T09:12:04.502Z member left: conn-77d0… reason=backpressure (members=1)
//! ```

use std::io::Write;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::config::TraceTarget;
use crate::hub::LeaveReason;

/// One thing the hub did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent<'a> {
    Joined {
        id: &'a str,
        members: usize,
    },
    Left {
        id: &'a str,
        reason: LeaveReason,
        members: usize,
    },
    /// A payload arrived for fan-out.
    Received {
        from: Option<&'a str>,
        len: usize,
    },
    Delivered {
        id: &'a str,
    },
    /// The member's queue refused the payload; it is being removed.
    DeliveryFailed {
        id: &'a str,
    },
    /// Leave for a connection that is no longer a member.
    UnknownLeave {
        id: &'a str,
    },
    Stopped {
        members: usize,
    },
}

impl std::fmt::Display for TraceEvent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceEvent::Joined { id, members } => {
                write!(f, "member joined: {id} (members={members})")
            }
            TraceEvent::Left {
                id,
                reason,
                members,
            } => write!(f, "member left: {id} reason={reason} (members={members})"),
            TraceEvent::Received { from, len } => write!(
                f,
                "message received from {}: {len} bytes",
                from.unwrap_or("server")
            ),
            TraceEvent::Delivered { id } => write!(f, " -- delivered to {id}"),
            TraceEvent::DeliveryFailed { id } => {
                write!(f, " -- delivery failed, evicting {id}")
            }
            TraceEvent::UnknownLeave { id } => write!(f, "leave for non-member {id} ignored"),
            TraceEvent::Stopped { members } => {
                write!(f, "hub stopped, closed {members} member queues")
            }
        }
    }
}

/// Sink for hub events.
pub trait Tracer: Send + Sync {
    fn trace(&self, event: &TraceEvent<'_>);
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct Off;

impl Tracer for Off {
    fn trace(&self, _event: &TraceEvent<'_>) {}
}

#[derive(Debug, Clone, Copy)]
enum LineFormat {
    Text,
    Json,
}

/// Writes one line per event to `W`.
pub struct WriterTracer<W> {
    out: Mutex<W>,
    format: LineFormat,
}

impl<W: Write + Send> WriterTracer<W> {
    /// Timestamped human-readable lines.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            format: LineFormat::Text,
        }
    }

    /// One JSON object per line.
    pub fn json(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            format: LineFormat::Json,
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> Tracer for WriterTracer<W> {
    fn trace(&self, event: &TraceEvent<'_>) {
        let line = match self.format {
            LineFormat::Text => format!(
                "{} {event}",
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
            ),
            LineFormat::Json => match serde_json::to_string(event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!("failed to serialize trace event: {e}");
                    return;
                }
            },
        };
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Tracing is best effort.
        let _ = writeln!(out, "{line}");
    }
}

/// Forwards events to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn trace(&self, event: &TraceEvent<'_>) {
        match event {
            TraceEvent::Joined { id, members } => {
                tracing::debug!(connection_id = %id, members, "member joined")
            }
            TraceEvent::Left {
                id,
                reason,
                members,
            } => tracing::debug!(connection_id = %id, %reason, members, "member left"),
            TraceEvent::Received { from, len } => {
                tracing::debug!(from = from.unwrap_or("server"), len, "message received")
            }
            TraceEvent::Delivered { id } => tracing::trace!(connection_id = %id, "delivered"),
            TraceEvent::DeliveryFailed { id } => {
                tracing::debug!(connection_id = %id, "delivery failed")
            }
            TraceEvent::UnknownLeave { id } => {
                tracing::debug!(connection_id = %id, "leave for non-member ignored")
            }
            TraceEvent::Stopped { members } => tracing::debug!(members, "hub stopped"),
        }
    }
}

/// Builds the sink selected in configuration.
pub fn from_target(target: TraceTarget) -> Arc<dyn Tracer> {
    match target {
        TraceTarget::Off => Arc::new(Off),
        TraceTarget::Stdout => Arc::new(WriterTracer::new(std::io::stdout())),
        TraceTarget::Json => Arc::new(WriterTracer::json(std::io::stdout())),
        TraceTarget::Log => Arc::new(LogTracer),
    }
}
