use tokio::sync::{mpsc, oneshot};
use tungstenite::protocol::Message as WsMessage;

use crate::client::{Connection, ConnectionId};
use crate::hub::{Control, Join, Publish};
use crate::utils::{Error, Result};

/// Cloneable entry point to a running [`Hub`](crate::hub::Hub).
///
/// These are the only ways to change membership or broadcast. Every call
/// fails with [`Error::HubClosed`] once the control loop has stopped.
#[derive(Debug, Clone)]
pub struct HubHandle {
    pub(crate) join_tx: mpsc::Sender<Join>,
    pub(crate) leave_tx: mpsc::UnboundedSender<ConnectionId>,
    pub(crate) publish_tx: mpsc::Sender<Publish>,
    pub(crate) control_tx: mpsc::Sender<Control>,
}

impl HubHandle {
    /// Hands `conn` to the hub and waits until it is a member.
    ///
    /// A Leave or Publish sent after this returns is always handled after
    /// the Join, even though they travel on other queues.
    pub async fn join(&self, conn: Connection) -> Result<()> {
        let (ack, joined) = oneshot::channel();
        self.join_tx
            .send(Join { conn, ack })
            .await
            .map_err(|_| Error::HubClosed)?;
        joined.await.map_err(|_| Error::HubClosed)
    }

    /// Asks the hub to remove `id` and close its outbound queue.
    ///
    /// Does not wait, so it can be called from `Drop`.
    pub fn leave(&self, id: ConnectionId) -> Result<()> {
        self.leave_tx.send(id).map_err(|_| Error::HubClosed)
    }

    /// Queues `payload` for fan-out to every member.
    pub async fn publish(&self, from: Option<ConnectionId>, payload: WsMessage) -> Result<()> {
        self.publish_tx
            .send(Publish { from, payload })
            .await
            .map_err(|_| Error::HubClosed)
    }

    /// Ids of the current members, as seen by the control loop.
    pub async fn members(&self) -> Result<Vec<ConnectionId>> {
        let (tx, rx) = oneshot::channel();
        self.control_tx
            .send(Control::Members(tx))
            .await
            .map_err(|_| Error::HubClosed)?;
        rx.await.map_err(|_| Error::HubClosed)
    }

    /// Stops the hub. Members' queues are closed, so their writers drain and
    /// close their sockets.
    pub async fn shutdown(&self) -> Result<()> {
        self.control_tx
            .send(Control::Shutdown)
            .await
            .map_err(|_| Error::HubClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.join_tx.is_closed()
    }
}
