use async_trait::async_trait;
use tandem_core::{PeerId, SignalMessage};

/// Outbound side of the relay as seen by the room coordinator.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Deliver one signaling frame to a peer. Returns `false` if the peer has no live
    /// connection; the frame is then lost.
    async fn send_signal(&self, peer_id: &PeerId, msg: SignalMessage) -> bool;
}
