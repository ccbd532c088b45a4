//! Ur game session over stdin/stdout.
//!
//! Reads one JSON client message per line from stdin and writes view commands
//! as JSON lines on stdout. Logs go to stderr.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod protocol;
mod session;
mod store;

use config::SessionConfig;
use protocol::ClientMessage;
use session::{GameSession, StdoutView};
use store::FileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = SessionConfig::from_env()?;
    info!(data_dir = %config.data_dir.display(), "Starting Ur session...");

    let store = FileStore::new(&config.data_dir);
    let (session, handle) = GameSession::new(&config, store, StdoutView)?;
    let task = tokio::spawn(session.run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ClientMessage>(&line) {
            Ok(message) => handle.send(message)?,
            Err(e) => warn!("Invalid message {}: {}", line, e),
        }
    }

    info!(session = %handle.id, "Input closed, shutting down");
    handle.shutdown();
    task.await?;
    Ok(())
}
