use crate::transport::ChannelTransport;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// The application data channel of one negotiated session.
pub struct DataChannel {
    state: ChannelState,
    inner: Option<Arc<dyn ChannelTransport>>,
}

impl Default for DataChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl DataChannel {
    pub fn new() -> Self {
        Self {
            state: ChannelState::Connecting,
            inner: None,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ChannelState::Open
    }

    pub fn label(&self) -> Option<String> {
        self.inner.as_ref().map(|inner| inner.label())
    }

    /// Transport reported the channel open. Ignored once closing started.
    pub fn attach(&mut self, inner: Arc<dyn ChannelTransport>) {
        if self.state != ChannelState::Connecting {
            warn!("Ignoring channel open in state {:?}", self.state);
            return;
        }
        debug!("Data channel '{}' attached", inner.label());
        self.inner = Some(inner);
        self.state = ChannelState::Open;
    }

    /// Sends a text frame. No-op unless the channel is open.
    pub async fn send(&self, text: &str) -> bool {
        let Some(inner) = self.inner.as_ref().filter(|_| self.is_open()) else {
            warn!("Dropping message, data channel is {:?}", self.state);
            return false;
        };
        match inner.send_text(text.to_owned()).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to send on data channel: {:#}", e);
                false
            }
        }
    }

    /// Serializes `value` to JSON and sends it as text.
    pub async fn send_json<T: Serialize>(&self, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(text) => self.send(&text).await,
            Err(e) => {
                error!("Failed to serialize outbound payload: {}", e);
                false
            }
        }
    }

    /// Closes the channel. Safe to call in any state, any number of times.
    pub async fn close(&mut self) {
        if self.state == ChannelState::Closed {
            return;
        }
        self.state = ChannelState::Closing;
        if let Some(inner) = self.inner.take() {
            if let Err(e) = inner.close().await {
                warn!("Error closing data channel: {:#}", e);
            }
        }
        self.state = ChannelState::Closed;
    }

    /// The remote end or the network closed the channel.
    pub fn mark_closed(&mut self) {
        self.inner = None;
        self.state = ChannelState::Closed;
    }
}
