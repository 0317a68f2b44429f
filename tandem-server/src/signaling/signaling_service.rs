use crate::registry::{ConnectionId, PeerHandle, PeerRegistry};
use crate::room::RoomCommand;
use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tandem_core::{IceServerConfig, PeerId, RawEnvelope, SignalMessage};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

struct SignalingInner {
    registry: Arc<dyn PeerRegistry>,
    ice_servers: Vec<IceServerConfig>,
    next_connection: AtomicU64,
}

/// Relay front: owns the peer registry and forwards frames between sockets.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
    pub(crate) room_cmd_tx: mpsc::Sender<RoomCommand>,
}

impl SignalingService {
    pub fn new(
        registry: Arc<dyn PeerRegistry>,
        room_cmd_tx: mpsc::Sender<RoomCommand>,
        ice_servers: Vec<IceServerConfig>,
    ) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                registry,
                ice_servers,
                next_connection: AtomicU64::new(1),
            }),
            room_cmd_tx,
        }
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn registry(&self) -> &Arc<dyn PeerRegistry> {
        &self.inner.registry
    }

    pub(crate) fn next_connection_id(&self) -> ConnectionId {
        self.inner.next_connection.fetch_add(1, Ordering::Relaxed)
    }

    /// Registers `handle` under `peer_id`, returning the handle it displaced.
    pub fn add_peer(&self, peer_id: PeerId, handle: PeerHandle) -> Option<PeerHandle> {
        let previous = self.inner.registry.register(peer_id.clone(), handle)?;
        warn!(
            "Peer id {} re-registered, replacing connection #{}",
            peer_id,
            previous.connection()
        );
        Some(previous)
    }

    /// Returns whether `connection` still owned the id and was removed.
    pub fn remove_peer(&self, peer_id: &PeerId, connection: ConnectionId) -> bool {
        self.inner.registry.unregister(peer_id, connection)
    }

    pub fn send_message(&self, peer_id: &PeerId, msg: &SignalMessage) -> bool {
        match msg.to_frame() {
            Ok(json) => self.inner.registry.deliver(peer_id, json),
            Err(e) => {
                error!("Failed to serialize signal message: {}", e);
                false
            }
        }
    }

    /// Forwards a directed envelope to its target, stamping the sender.
    ///
    /// Unknown or disconnected targets are dropped without any reply to the sender.
    pub fn route(&self, from: &PeerId, mut envelope: RawEnvelope) -> bool {
        let Some(target) = envelope.target() else {
            warn!("'{}' from {} has no target, dropping", envelope.kind(), from);
            return false;
        };

        envelope.fill_sender(from);
        let kind = envelope.kind().to_owned();
        let delivered = self.inner.registry.deliver(&target, envelope.into_frame());
        if delivered {
            debug!("Relayed '{}' {} -> {}", kind, from, target);
        } else {
            debug!("Dropped '{}' {} -> {} (no live handle)", kind, from, target);
        }
        delivered
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn send_signal(&self, peer_id: &PeerId, msg: SignalMessage) -> bool {
        self.send_message(peer_id, &msg)
    }
}
