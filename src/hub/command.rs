use serde::Serialize;
use tokio::sync::oneshot;
use tungstenite::protocol::Message as WsMessage;

use crate::client::{Connection, ConnectionId};

/// A connection asking to become a member.
///
/// `ack` fires once the control loop has inserted the member, so anything
/// the connection sends to the hub afterwards is handled after its Join.
#[derive(Debug)]
pub struct Join {
    pub conn: Connection,
    pub(crate) ack: oneshot::Sender<()>,
}

/// A payload to fan out, with the connection it came from.
#[derive(Debug)]
pub struct Publish {
    /// `None` for messages injected by the server itself.
    pub from: Option<ConnectionId>,
    pub payload: WsMessage,
}

/// Requests that are not membership changes or broadcasts.
#[derive(Debug)]
pub enum Control {
    /// Snapshot of the current member ids.
    Members(oneshot::Sender<Vec<ConnectionId>>),
    /// Stop accepting joins, close every member queue and exit the loop.
    Shutdown,
}

/// Why a member was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveReason {
    /// The connection's own task asked to leave.
    Requested,
    /// The outbound queue was full during fan-out.
    Backpressure,
    /// The writer had already dropped its end of the queue.
    Closed,
    /// The hub is shutting down.
    Shutdown,
}

impl std::fmt::Display for LeaveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LeaveReason::Requested => "requested",
            LeaveReason::Backpressure => "backpressure",
            LeaveReason::Closed => "closed",
            LeaveReason::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}
