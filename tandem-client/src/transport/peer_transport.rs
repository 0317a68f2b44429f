use crate::transport::SessionEvent;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tandem_core::{IceCandidate, IceServerConfig, SessionTag};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Anything a remote ICE candidate can be applied to.
#[async_trait]
pub trait CandidateSink: Send + Sync {
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;
}

/// One native peer connection. Created fresh for every negotiation attempt and
/// never reused after `close`.
#[async_trait]
pub trait PeerTransport: CandidateSink {
    /// Opens the outgoing data channel, then creates and applies the local offer.
    async fn create_offer(&self, channel_label: &str) -> Result<String>;

    /// Creates and applies the local answer. Requires a remote offer.
    async fn create_answer(&self) -> Result<String>;

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// An open bidirectional text channel.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    fn label(&self) -> String;

    async fn send_text(&self, text: String) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait TransportFactory: Send + Sync + 'static {
    type Transport: PeerTransport + 'static;

    /// Every callback of the returned transport is posted to `events` tagged with
    /// `session`.
    async fn create(
        &self,
        session: SessionTag,
        ice_servers: &[IceServerConfig],
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Arc<Self::Transport>>;
}
