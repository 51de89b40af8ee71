//! Hub engine
//!
//! The control loop that owns the membership map. It reacts to whichever of
//! join, leave, publish or control is ready, one at a time. Nothing else
//! touches `members`.
//!
//! Fan-out never waits on a member: each delivery is a `try_send`. A member
//! whose outbound queue is full is evicted on the spot, so one slow reader
//! cannot hold up the others and nobody buffers without bound.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::client::{Connection, ConnectionId};
use crate::config::HubSettings;
use crate::hub::tracer::{Off, TraceEvent, Tracer};
use crate::hub::{Control, HubHandle, Join, LeaveReason, Publish};

/// Capacity of the join, publish and control queues. Senders wait until
/// the control loop takes the previous item; Join additionally waits for
/// its ack.
const HANDOFF_CAPACITY: usize = 1;

pub struct Hub {
    pub(crate) members: HashMap<ConnectionId, Connection>,
    pub(crate) join_rx: mpsc::Receiver<Join>,
    pub(crate) leave_rx: mpsc::UnboundedReceiver<ConnectionId>,
    pub(crate) publish_rx: mpsc::Receiver<Publish>,
    pub(crate) control_rx: mpsc::Receiver<Control>,
    settings: HubSettings,
    tracer: Arc<dyn Tracer>,
}

impl Hub {
    /// Creates a hub that is not running yet, and the handle to reach it.
    pub fn new(settings: HubSettings) -> (Self, HubHandle) {
        let (join_tx, join_rx) = mpsc::channel(HANDOFF_CAPACITY);
        let (leave_tx, leave_rx) = mpsc::unbounded_channel();
        let (publish_tx, publish_rx) = mpsc::channel(HANDOFF_CAPACITY);
        let (control_tx, control_rx) = mpsc::channel(HANDOFF_CAPACITY);

        let hub = Self {
            members: HashMap::new(),
            join_rx,
            leave_rx,
            publish_rx,
            control_rx,
            settings,
            tracer: Arc::new(Off),
        };
        let handle = HubHandle {
            join_tx,
            leave_tx,
            publish_tx,
            control_tx,
        };
        (hub, handle)
    }

    /// Replaces the default no-op tracer.
    pub fn with_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Runs the control loop on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// The control loop. Returns after [`Control::Shutdown`] or once every
    /// handle and leave guard is gone.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(join) = self.join_rx.recv() => self.handle_join(join),
                Some(id) = self.leave_rx.recv() => self.remove(&id, LeaveReason::Requested),
                Some(msg) = self.publish_rx.recv() => self.handle_publish(msg),
                Some(ctrl) = self.control_rx.recv() => match ctrl {
                    Control::Members(reply) => {
                        let _ = reply.send(self.members.keys().cloned().collect());
                    }
                    Control::Shutdown => break,
                },
                else => break,
            }
        }
        self.shutdown();
    }

    fn handle_join(&mut self, join: Join) {
        let Join { conn, ack } = join;
        let id = conn.id.clone();
        debug!(connection_id = %id, authenticated = conn.identity.is_some(), "join");
        self.members.insert(id.clone(), conn);
        self.tracer.trace(&TraceEvent::Joined {
            id: id.as_str(),
            members: self.members.len(),
        });
        if ack.send(()).is_err() {
            // the joining task is gone and will never send its Leave
            self.remove(&id, LeaveReason::Closed);
        }
    }

    fn handle_publish(&mut self, msg: Publish) {
        let Publish { from, payload } = msg;
        self.tracer.trace(&TraceEvent::Received {
            from: from.as_deref(),
            len: payload.len(),
        });

        let mut dropped = Vec::new();
        for (id, member) in &self.members {
            if !self.settings.echo_to_sender && from.as_deref() == Some(id.as_str()) {
                continue;
            }
            match member.sender.try_send(payload.clone()) {
                Ok(()) => self.tracer.trace(&TraceEvent::Delivered { id: id.as_str() }),
                Err(TrySendError::Full(_)) => {
                    self.tracer.trace(&TraceEvent::DeliveryFailed { id: id.as_str() });
                    dropped.push((id.clone(), LeaveReason::Backpressure));
                }
                Err(TrySendError::Closed(_)) => {
                    self.tracer.trace(&TraceEvent::DeliveryFailed { id: id.as_str() });
                    dropped.push((id.clone(), LeaveReason::Closed));
                }
            }
        }

        for (id, reason) in dropped {
            if reason == LeaveReason::Backpressure {
                info!(connection_id = %id, "outbound queue full, evicting member");
            }
            self.remove(&id, reason);
        }
    }

    /// Removes `id` and drops its queue sender, which closes the queue.
    /// Removing a non-member does nothing.
    fn remove(&mut self, id: &str, reason: LeaveReason) {
        match self.members.remove(id) {
            Some(conn) => {
                drop(conn);
                debug!(connection_id = %id, %reason, "leave");
                self.tracer.trace(&TraceEvent::Left {
                    id,
                    reason,
                    members: self.members.len(),
                });
            }
            None => self.tracer.trace(&TraceEvent::UnknownLeave { id }),
        }
    }

    fn shutdown(&mut self) {
        self.join_rx.close();
        // Joins already queued are turned away: dropping the ack fails their
        // `join` and dropping the connection closes its queue.
        while self.join_rx.try_recv().is_ok() {}

        let ids: Vec<ConnectionId> = self.members.keys().cloned().collect();
        let closed = ids.len();
        for id in ids {
            self.remove(&id, LeaveReason::Shutdown);
        }
        info!(members = closed, "hub stopped");
        self.tracer.trace(&TraceEvent::Stopped { members: closed });
    }
}
