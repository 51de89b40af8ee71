//! Reader and writer loops of one connection.
//!
//! Both are generic over the two halves of a split WebSocket so they can be
//! driven by in-memory streams in tests.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tungstenite::Error as WsError;
use tungstenite::protocol::Message as WsMessage;

use crate::client::ConnectionId;
use crate::hub::HubHandle;
use crate::utils::{Error, Result};

/// Publishes every data frame read from `stream` until the peer closes or
/// the transport fails.
///
/// Ping and pong are answered by tungstenite itself and are skipped here.
pub async fn read_loop<S>(mut stream: S, hub: HubHandle, id: ConnectionId) -> Result<()>
where
    S: Stream<Item = std::result::Result<WsMessage, WsError>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame.map_err(Error::Read)? {
            msg @ (WsMessage::Text(_) | WsMessage::Binary(_)) => {
                hub.publish(Some(id.clone()), msg).await?;
            }
            WsMessage::Close(_) => break,
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
        }
    }
    Ok(())
}

/// Writes queued messages to `sink` in order. Once the hub closes the queue
/// and it is drained, closes the sink.
pub async fn write_loop<K>(mut sink: K, mut outbound: mpsc::Receiver<WsMessage>) -> Result<()>
where
    K: Sink<WsMessage, Error = WsError> + Unpin,
{
    while let Some(msg) = outbound.recv().await {
        sink.send(msg).await.map_err(Error::Write)?;
    }
    match sink.close().await {
        // peer hung up first
        Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
        Err(e) => Err(Error::Write(e)),
    }
}
