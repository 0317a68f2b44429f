use anyhow::{Context, Result, bail};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tandem_core::{PeerId, SignalMessage};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::signal_helpers::SIGNAL_TIMEOUT_MS;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Raw websocket peer talking to a live relay.
pub struct TestClient {
    /// Id the relay registered this socket under.
    pub peer_id: PeerId,
    socket: Socket,
}

impl TestClient {
    /// Connect to `{base}/ws` (or `{base}/ws/{id}`) and consume the registration
    /// handshake.
    pub async fn connect(base: &str, peer_id: Option<&str>) -> Result<Self> {
        let url = match peer_id {
            Some(id) => format!("{}/ws/{}", base, id),
            None => format!("{}/ws", base),
        };
        let (socket, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;

        let mut client = Self {
            peer_id: PeerId::from(""),
            socket,
        };

        match client.recv_signal(SIGNAL_TIMEOUT_MS).await? {
            SignalMessage::Registered { user_id } => client.peer_id = user_id,
            other => bail!("Expected 'registered', got {:?}", other),
        }
        match client.recv_signal(SIGNAL_TIMEOUT_MS).await? {
            SignalMessage::IceConfig { .. } => {}
            other => bail!("Expected 'ice-config', got {:?}", other),
        }

        tracing::debug!("[TestClient] connected as {}", client.peer_id);
        Ok(client)
    }

    pub async fn send(&mut self, msg: &SignalMessage) -> Result<()> {
        let json = serde_json::to_string(msg)?;
        self.send_raw(&json).await
    }

    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.socket
            .send(Message::text(text.to_owned()))
            .await
            .context("Failed to send frame")
    }

    pub async fn join(&mut self, room: &str) -> Result<()> {
        self.send(&SignalMessage::JoinRoom { room: room.into() })
            .await
    }

    /// Next text frame as JSON.
    pub async fn recv(&mut self, timeout_ms: u64) -> Result<Value> {
        loop {
            let next = tokio::time::timeout(Duration::from_millis(timeout_ms), self.socket.next())
                .await
                .context("Timeout waiting for frame")?;

            match next {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str()).context("Frame is not JSON");
                }
                Some(Ok(Message::Close(_))) | None => bail!("Socket closed"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => bail!("Socket error: {}", e),
            }
        }
    }

    pub async fn recv_signal(&mut self, timeout_ms: u64) -> Result<SignalMessage> {
        let value = self.recv(timeout_ms).await?;
        serde_json::from_value(value).context("Frame is not a SignalMessage")
    }

    /// True when nothing arrives within `ms`.
    pub async fn expect_silence(&mut self, ms: u64) -> bool {
        self.recv(ms).await.is_err()
    }

    pub async fn close(mut self) -> Result<()> {
        self.socket.close(None).await.context("Failed to close socket")
    }
}
