use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tandem_core::SignalMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long `close` waits for the writer to flush its close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Opens a fresh link to the relay. One link per relay session; a reconnect always
/// asks for a new one.
#[async_trait]
pub trait SignalConnector: Send + Sync + 'static {
    async fn open(&self) -> Result<SignalLink>;
}

/// A duplex stream of signaling frames.
///
/// `inbound` yields `None` once the relay side is gone.
pub struct SignalLink {
    outbound: mpsc::UnboundedSender<SignalMessage>,
    inbound: mpsc::UnboundedReceiver<SignalMessage>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
}

impl SignalLink {
    /// A link backed by plain channels, with no socket tasks to supervise.
    pub fn new(
        outbound: mpsc::UnboundedSender<SignalMessage>,
        inbound: mpsc::UnboundedReceiver<SignalMessage>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            writer: None,
            reader: None,
        }
    }

    pub(crate) fn with_tasks(
        outbound: mpsc::UnboundedSender<SignalMessage>,
        inbound: mpsc::UnboundedReceiver<SignalMessage>,
        writer: JoinHandle<()>,
        reader: JoinHandle<()>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            writer: Some(writer),
            reader: Some(reader),
        }
    }

    pub fn send(&self, msg: SignalMessage) -> bool {
        let kind = msg.kind();
        if self.outbound.send(msg).is_err() {
            warn!("Signaling link closed, dropping '{}'", kind);
            return false;
        }
        true
    }

    pub async fn recv(&mut self) -> Option<SignalMessage> {
        self.inbound.recv().await
    }

    /// Flushes pending frames, closes the socket and waits for both socket tasks.
    pub async fn close(self) {
        let SignalLink {
            outbound,
            inbound,
            writer,
            reader,
        } = self;
        drop(outbound);
        drop(inbound);

        if let Some(writer) = writer {
            if tokio::time::timeout(CLOSE_TIMEOUT, writer).await.is_err() {
                warn!("Signaling writer did not finish in time");
            }
        }
        if let Some(reader) = reader {
            reader.abort();
            let _ = reader.await;
        }
        debug!("Signaling link closed");
    }
}
