//! WebSocket transport
//!
//! Accepts TCP connections, upgrades them to WebSocket and wires each one to
//! the hub:
//! - build a `Connection` with its bounded outbound queue
//! - Join the hub, then arm a `LeaveGuard`
//! - spawn the writer loop and run the reader loop
//! - when either loop ends, the guard issues the single Leave
//!
//! A failed upgrade or a broken socket only ends that one connection.

use std::net::SocketAddr;

use futures_util::{Sink, Stream, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async_with_config;
use tracing::{debug, info, warn};
use tungstenite::Error as WsError;
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::protocol::{Message as WsMessage, WebSocketConfig};

use crate::client::{Connection, LeaveGuard};
use crate::config::Settings;
use crate::hub::HubHandle;
use crate::transport::{identity, pump};
use crate::utils::{Error, Result};

/// Binds `settings.bind_addr()` and serves connections until the hub stops.
pub async fn start_websocket_server(settings: &Settings, hub: HubHandle) -> Result<()> {
    let addr = settings.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| Error::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!("WebSocket server listening on ws://{addr}");
    serve(listener, hub, settings.clone()).await;
    Ok(())
}

/// Accept loop. Each socket is handled on its own task.
pub async fn serve(listener: TcpListener, hub: HubHandle, settings: Settings) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("failed to accept connection: {e}");
                continue;
            }
        };
        if hub.is_closed() {
            debug!(%peer, "hub closed, no longer accepting");
            break;
        }

        let hub = hub.clone();
        let settings = settings.clone();
        tokio::spawn(async move {
            match accept_connection(stream, peer, hub, &settings).await {
                Ok(()) => info!(%peer, "websocket disconnected"),
                Err(Error::Upgrade(e)) => warn!(%peer, "WebSocket handshake error: {e}"),
                Err(Error::HubClosed) => debug!(%peer, "hub closed while connected"),
                Err(e) => info!(%peer, "websocket closed: {e}"),
            }
        });
    }
}

async fn accept_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: HubHandle,
    settings: &Settings,
) -> Result<()> {
    let mut token = None;
    let callback = |req: &Request, resp: Response| -> std::result::Result<Response, ErrorResponse> {
        token = identity::auth_cookie(req);
        Ok(resp)
    };
    let config = WebSocketConfig::default()
        .read_buffer_size(settings.transport.socket_buffer_size)
        .write_buffer_size(settings.transport.socket_buffer_size);

    let ws_stream = accept_hdr_async_with_config(stream, callback, Some(config))
        .await
        .map_err(Error::Upgrade)?;
    info!(%peer, authenticated = token.is_some(), "websocket connected");

    let (ws_sender, ws_receiver) = ws_stream.split();
    serve_connection(
        hub,
        ws_receiver,
        ws_sender,
        token,
        settings.hub.message_buffer_size,
    )
    .await
}

/// Runs one connection from Join to Leave.
///
/// Returns when the reader loop ends or the writer task ends, whichever is
/// first. Leave is issued exactly once on every path; if the Join itself
/// fails nothing is issued.
pub async fn serve_connection<S, K>(
    hub: HubHandle,
    stream: S,
    sink: K,
    identity: Option<String>,
    capacity: usize,
) -> Result<()>
where
    S: Stream<Item = std::result::Result<WsMessage, WsError>> + Unpin,
    K: Sink<WsMessage, Error = WsError> + Unpin + Send + 'static,
{
    let (conn, outbound) = Connection::new(capacity, identity);
    let id = conn.id.clone();
    hub.join(conn).await?;
    let guard = LeaveGuard::new(id.clone(), hub.clone());

    let mut writer = tokio::spawn(pump::write_loop(sink, outbound));
    let result = tokio::select! {
        res = pump::read_loop(stream, hub, id.clone()) => res,
        res = &mut writer => res.map_err(Error::from).and_then(|r| r),
    };

    drop(guard);
    debug!(connection_id = %id, ok = result.is_ok(), "connection finished");
    result
}
