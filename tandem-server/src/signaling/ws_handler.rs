use crate::registry::{ConnectionId, PeerHandle};
use crate::{RoomCommand, SignalingService};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tandem_core::{PeerId, RawEnvelope, SignalMessage};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// `GET /ws/{peer_id}`: the client picks its own id.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(peer_id): Path<String>,
    State(service): State<SignalingService>,
) -> impl IntoResponse {
    let peer_id = PeerId::from(peer_id);

    ws.on_upgrade(move |socket| handle_socket(socket, peer_id, service))
}

/// `GET /ws`: the relay assigns an id, the client may claim another with `register`.
pub async fn ws_handler_anonymous(
    ws: WebSocketUpgrade,
    State(service): State<SignalingService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, PeerId::new(), service))
}

/// Per-socket state owned by the reader loop.
struct PeerConnection {
    peer_id: PeerId,
    connection: ConnectionId,
    tx: mpsc::UnboundedSender<Message>,
}

impl PeerConnection {
    fn handle(&self) -> PeerHandle {
        PeerHandle::new(self.connection, self.tx.clone())
    }
}

async fn handle_socket(socket: WebSocket, peer_id: PeerId, service: SignalingService) {
    let connection = service.next_connection_id();
    info!("New WebSocket connection #{}: {}", connection, peer_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut conn = PeerConnection {
        peer_id,
        connection,
        tx,
    };
    register(&service, &conn).await;

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let Some(Ok(msg)) = incoming else { break };
                match msg {
                    Message::Text(text) => handle_text(&service, &mut conn, text.as_str()).await,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            _ = &mut send_task => break,
        }
    }

    send_task.abort();

    if service.remove_peer(&conn.peer_id, conn.connection) {
        let _ = service
            .room_cmd_tx
            .send(RoomCommand::Disconnect {
                peer_id: conn.peer_id.clone(),
            })
            .await;
    }
    info!("WebSocket #{} disconnected: {}", conn.connection, conn.peer_id);
}

async fn register(service: &SignalingService, conn: &PeerConnection) {
    let displaced = service
        .add_peer(conn.peer_id.clone(), conn.handle())
        .filter(|previous| previous.connection() != conn.connection);

    // The displaced socket's room membership goes with it, before this socket can join.
    if displaced.is_some() {
        let _ = service
            .room_cmd_tx
            .send(RoomCommand::Disconnect {
                peer_id: conn.peer_id.clone(),
            })
            .await;
    }

    service.send_message(
        &conn.peer_id,
        &SignalMessage::Registered {
            user_id: conn.peer_id.clone(),
        },
    );
    service.send_message(
        &conn.peer_id,
        &SignalMessage::IceConfig {
            ice_servers: service.get_ice_servers(),
        },
    );
}

async fn handle_text(service: &SignalingService, conn: &mut PeerConnection, text: &str) {
    let envelope = match RawEnvelope::parse(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Ignoring malformed frame from {}: {}", conn.peer_id, e);
            return;
        }
    };

    if envelope.is_directed() {
        service.route(&conn.peer_id, envelope);
        return;
    }

    let signal = match envelope.into_message() {
        Ok(signal) => signal,
        Err(e) => {
            warn!("Invalid SignalMessage from {}: {}", conn.peer_id, e);
            return;
        }
    };

    let cmd = match signal {
        SignalMessage::Register { user_id } => {
            reregister(service, conn, user_id).await;
            return;
        }
        SignalMessage::JoinRoom { room } => RoomCommand::Join {
            peer_id: conn.peer_id.clone(),
            room,
        },
        SignalMessage::LeaveRoom { room } => RoomCommand::Leave {
            peer_id: conn.peer_id.clone(),
            room,
        },
        other => {
            debug!("Ignoring '{}' from {}", other.kind(), conn.peer_id);
            return;
        }
    };

    if let Err(e) = service.room_cmd_tx.send(cmd).await {
        error!("Room coordinator died: {}", e);
    }
}

/// Moves the socket to a client-chosen id. The previous id leaves its room as if it
/// had disconnected.
async fn reregister(service: &SignalingService, conn: &mut PeerConnection, user_id: PeerId) {
    if user_id == conn.peer_id {
        service.add_peer(conn.peer_id.clone(), conn.handle());
        service.send_message(
            &conn.peer_id,
            &SignalMessage::Registered {
                user_id: conn.peer_id.clone(),
            },
        );
        return;
    }

    info!("Connection #{} registers as {}", conn.connection, user_id);
    let previous = std::mem::replace(&mut conn.peer_id, user_id);
    if service.remove_peer(&previous, conn.connection) {
        let _ = service
            .room_cmd_tx
            .send(RoomCommand::Disconnect { peer_id: previous })
            .await;
    }

    register(service, conn).await;
}
