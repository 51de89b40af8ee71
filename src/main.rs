//! CLI for roomcast
//!
//! Subcommands:
//! - `server`: run the hub and the WebSocket server
//! - `client`: a terminal chat client (stdin lines out, frames in)

use std::sync::Arc;

use clap::Parser;
use roomcast::config::load_config;
use roomcast::hub::{self, Hub};
use roomcast::transport::start_websocket_server;
use roomcast::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "roomcast")]
struct Cli {
    /// Log level: error, warn, info, debug or trace
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Start the WebSocket server
    Server,
    /// Connect to a server, send stdin lines and print what arrives
    Client {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
    },
}

#[tokio::main]
async fn main() {
    // a missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match cli.command {
        Command::Server => {
            if let Err(e) = run_server().await {
                error!("Server failed: {}", e);
            }
        }
        Command::Client { url } => {
            if let Err(e) = run_client(&url).await {
                error!("Client failed: {}", e);
            }
        }
    }
}

async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let tracer: Arc<dyn hub::Tracer> = hub::from_target(config.hub.trace);
    let (room, handle) = Hub::new(config.hub.clone());
    let hub_task = room.with_tracer(tracer).spawn();

    tokio::select! {
        res = start_websocket_server(&config, handle.clone()) => {
            if let Err(e) = res {
                error!("WebSocket server exited: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    if handle.shutdown().await.is_ok() {
        hub_task.await?;
    }
    Ok(())
}

async fn run_client(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let (ws_stream, _response) = connect_async(url).await?;
    info!("Connected to {url}");
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let printer = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(WsMessage::Text(text)) => println!("{}", text.as_str()),
                Ok(WsMessage::Binary(data)) => println!("<{} bytes>", data.len()),
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    error!("Connection lost: {e}");
                    break;
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        if ws_sender.send(WsMessage::text(line)).await.is_err() {
            break;
        }
    }

    let _ = ws_sender.close().await;
    let _ = printer.await;
    Ok(())
}
