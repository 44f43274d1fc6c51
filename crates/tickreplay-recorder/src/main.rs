//! Recorder client for the tick replay server.
//!
//! Connects to the replay stream and writes every text message to stdout,
//! one per line, so a replay can be captured with a shell redirect. Logs
//! go to stderr.
//!
//! The endpoint is assembled from `--protocol`, `--host`, `--port` and
//! `--path`, each falling back to `PROTOCOL`, `HOST`, `PORT` and
//! `WEBSOCKET_PATH` in the environment, then to `ws://localhost:18080/`.
//! `--url` overrides all of them.

use std::io::Write;

use clap::Parser;
use futures::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Errors that end a recording session.
#[derive(Debug, thiserror::Error)]
enum RecorderError {
    /// The `WebSocket` handshake or stream failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Writing to stdout failed.
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

/// Print every message streamed by a tick replay server.
#[derive(Debug, Parser)]
#[clap(name = "tickreplay-recorder")]
struct Args {
    /// Full endpoint URL; overrides the individual parts.
    #[clap(long)]
    url: Option<String>,

    /// `ws` or `wss` (env `PROTOCOL`).
    #[clap(long)]
    protocol: Option<String>,

    /// Server host (env `HOST`).
    #[clap(long)]
    host: Option<String>,

    /// Server port (env `PORT`).
    #[clap(long)]
    port: Option<u16>,

    /// Stream path (env `WEBSOCKET_PATH`).
    #[clap(long)]
    path: Option<String>,
}

impl Args {
    /// Build the endpoint URL, consulting `lookup` for unset parts.
    fn endpoint<F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let protocol = self
            .protocol
            .clone()
            .or_else(|| lookup("PROTOCOL"))
            .unwrap_or_else(|| "ws".to_owned());
        let host = self
            .host
            .clone()
            .or_else(|| lookup("HOST"))
            .unwrap_or_else(|| "localhost".to_owned());
        let port = self
            .port
            .or_else(|| lookup("PORT").and_then(|p| p.parse().ok()))
            .unwrap_or(18080);
        let path = self
            .path
            .clone()
            .or_else(|| lookup("WEBSOCKET_PATH"))
            .unwrap_or_else(|| "/".to_owned());
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        format!("{protocol}://{host}:{port}{path}")
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let url = args.endpoint(|key| std::env::var(key).ok());
    record(&url).await?;
    Ok(())
}

/// Stream `url` to stdout until the server closes the connection.
async fn record(url: &str) -> Result<(), RecorderError> {
    info!(url, "Connecting to replay server");
    let (mut socket, _) = connect_async(url).await?;
    info!("Connected, recording");

    let stdout = std::io::stdout();
    let mut received: u64 = 0;
    while let Some(msg) = socket.next().await {
        match msg? {
            Message::Text(text) => {
                let mut out = stdout.lock();
                writeln!(out, "{text}")?;
                out.flush()?;
                received = received.saturating_add(1);
            }
            Message::Close(frame) => {
                match frame {
                    Some(frame) => warn!(code = %frame.code, reason = %frame.reason, "Server closed the stream"),
                    None => info!("Server closed the stream"),
                }
                break;
            }
            other => debug!(kind = ?other, "Ignoring non-text frame"),
        }
    }

    info!(received, "Recording finished");
    Ok(())
}
