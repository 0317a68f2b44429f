use crate::signaling::{SignalConnector, SignalLink};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tandem_core::SignalMessage;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Dials the relay over a websocket.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SignalConnector for WsConnector {
    async fn open(&self) -> Result<SignalLink> {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", self.url))?;
        info!("Connected to signaling relay at {}", self.url);

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<SignalMessage>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<SignalMessage>();

        let writer = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let text = match msg.to_frame() {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode '{}': {}", msg.kind(), e);
                        continue;
                    }
                };
                if ws_write.send(Message::text(text)).await.is_err() {
                    break;
                }
            }
            let _ = ws_write.close().await;
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = ws_read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<SignalMessage>(text.as_str()) {
                            Ok(msg) => {
                                debug!("Received '{}'", msg.kind());
                                if in_tx.send(msg).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Ignoring malformed frame from relay: {}", e),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Signaling websocket closed: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(SignalLink::with_tasks(out_tx, in_rx, writer, reader))
    }
}
