use crate::config::ServerConfig;
use crate::registry::{InMemoryRegistry, PeerRegistry};
use crate::room::{RoomCommand, RoomCoordinator};
use crate::signaling::{SignalingService, ws_handler, ws_handler_anonymous};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Wires registry, signaling service and room coordinator together and spawns the
/// coordinator task. Must be called inside a tokio runtime.
pub fn build_router(config: &ServerConfig) -> (Router, SignalingService) {
    let (room_cmd_tx, room_cmd_rx) = mpsc::channel::<RoomCommand>(256);
    let registry: Arc<dyn PeerRegistry> = Arc::new(InMemoryRegistry::new());
    let signaling = SignalingService::new(registry, room_cmd_tx, config.ice_servers.clone());

    let coordinator = RoomCoordinator::new(room_cmd_rx, Arc::new(signaling.clone()));
    tokio::spawn(coordinator.run());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/ws", get(ws_handler_anonymous))
        .route("/ws/{peer_id}", get(ws_handler))
        .route("/health", get(health))
        .layer(cors)
        .with_state(signaling.clone());

    (app, signaling)
}

async fn health(State(service): State<SignalingService>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "peers": service.registry().len(),
    }))
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    serve_with_listener(listener, config).await
}

pub async fn serve_with_listener(listener: TcpListener, config: ServerConfig) -> Result<()> {
    let (app, _) = build_router(&config);

    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("Signaling relay listening on ws://{}/ws", addr);

    axum::serve(listener, app)
        .await
        .context("Signaling relay stopped unexpectedly")
}
