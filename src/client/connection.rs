use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

pub type ConnectionId = String;

/// A participant as seen by the hub.
///
/// The hub holds the only `sender`; dropping the `Connection` closes the
/// participant's outbound queue, after which its writer drains what is left
/// and stops.
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier, `conn-<uuid>`.
    pub id: ConnectionId,

    /// Opaque token attached at upgrade time, if the request carried one.
    pub identity: Option<String>,

    /// Sending half of the bounded outbound queue.
    pub sender: mpsc::Sender<WsMessage>,
}

impl Connection {
    /// Creates a connection with an outbound queue holding at most
    /// `capacity` messages (at least one). Returns the receiving half for the
    /// writer loop.
    pub fn new(capacity: usize, identity: Option<String>) -> (Self, mpsc::Receiver<WsMessage>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let conn = Self {
            id: format!("conn-{}", Uuid::new_v4()),
            identity,
            sender,
        };
        (conn, receiver)
    }
}
