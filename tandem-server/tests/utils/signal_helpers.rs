use anyhow::{Context, Result};
use tandem_server::{ServerConfig, serve_with_listener};
use tokio::net::TcpListener;

/// Timeout for one expected frame (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 5000;

/// How long to wait before concluding that nothing will arrive (ms).
pub const SILENCE_MS: u64 = 300;

/// Start a relay on an ephemeral localhost port and return its `ws://` base url.
pub async fn spawn_relay() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("Failed to bind test relay")?;
    let addr = listener.local_addr()?;

    let config = ServerConfig {
        host: addr.ip(),
        port: addr.port(),
        ..ServerConfig::default()
    };

    tokio::spawn(async move {
        if let Err(e) = serve_with_listener(listener, config).await {
            tracing::error!("[SignalHelper] relay stopped: {:?}", e);
        }
    });

    Ok(format!("ws://{}", addr))
}
