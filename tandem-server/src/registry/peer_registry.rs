use axum::extract::ws::Message;
use dashmap::DashMap;
use tandem_core::PeerId;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Identifies one accepted socket, so a late disconnect can be told apart from the
/// connection that currently owns a peer id.
pub type ConnectionId = u64;

/// Write side of one peer's socket. Frames pushed here are drained by the socket's
/// writer task.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    connection: ConnectionId,
    tx: mpsc::UnboundedSender<Message>,
}

impl PeerHandle {
    pub fn new(connection: ConnectionId, tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { connection, tx }
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send_text(&self, frame: String) -> bool {
        self.tx.send(Message::Text(frame.into())).is_ok()
    }
}

/// Maps peer ids to the live socket that last registered them.
///
/// Registration is last-writer-wins and unauthenticated; whoever supplies peer ids is
/// responsible for authenticating them.
pub trait PeerRegistry: Send + Sync + 'static {
    /// Stores the handle, returning the one it replaced.
    fn register(&self, peer_id: PeerId, handle: PeerHandle) -> Option<PeerHandle>;

    /// Removes the mapping if it still belongs to `connection`.
    fn unregister(&self, peer_id: &PeerId, connection: ConnectionId) -> bool;

    fn lookup(&self, peer_id: &PeerId) -> Option<PeerHandle>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Best-effort delivery of one text frame. Returns whether it was handed to a live
    /// socket; unknown or closed peers are dropped silently.
    fn deliver(&self, peer_id: &PeerId, frame: String) -> bool {
        let Some(handle) = self.lookup(peer_id) else {
            debug!("No live handle for {}, dropping frame", peer_id);
            return false;
        };

        if !handle.is_alive() {
            warn!("Handle for {} is closed, evicting", peer_id);
            self.unregister(peer_id, handle.connection());
            return false;
        }

        if handle.send_text(frame) {
            return true;
        }

        error!("Socket for {} closed during send", peer_id);
        self.unregister(peer_id, handle.connection());
        false
    }
}

#[derive(Default)]
pub struct InMemoryRegistry {
    peers: DashMap<PeerId, PeerHandle>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PeerRegistry for InMemoryRegistry {
    fn register(&self, peer_id: PeerId, handle: PeerHandle) -> Option<PeerHandle> {
        self.peers.insert(peer_id, handle)
    }

    fn unregister(&self, peer_id: &PeerId, connection: ConnectionId) -> bool {
        self.peers
            .remove_if(peer_id, |_, handle| handle.connection() == connection)
            .is_some()
    }

    fn lookup(&self, peer_id: &PeerId) -> Option<PeerHandle> {
        self.peers.get(peer_id).map(|entry| entry.value().clone())
    }

    fn len(&self) -> usize {
        self.peers.len()
    }
}
