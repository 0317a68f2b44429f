use crate::room::room::{Announcement, RoomTable};
use crate::room::room_command::RoomCommand;
use crate::signaling::SignalingOutput;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Owns every room and applies join/leave/disconnect commands one at a time.
///
/// All room state lives inside this task, so pairing decisions never race each other.
pub struct RoomCoordinator {
    table: RoomTable,
    command_rx: mpsc::Receiver<RoomCommand>,
    signaling: Arc<dyn SignalingOutput>,
}

impl RoomCoordinator {
    pub fn new(
        command_rx: mpsc::Receiver<RoomCommand>,
        signaling: Arc<dyn SignalingOutput>,
    ) -> Self {
        Self {
            table: RoomTable::new(),
            command_rx,
            signaling,
        }
    }

    pub async fn run(mut self) {
        info!("Room coordinator started");

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;
        }

        info!("Command channel closed. Room coordinator finished");
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        let announcements = match cmd {
            RoomCommand::Join { peer_id, room } => {
                info!("Peer {} wants to join room '{}'", peer_id, room);
                let (_, announcements) = self.table.join(&peer_id, &room);
                announcements
            }
            RoomCommand::Leave { peer_id, room } => {
                info!("Peer {} leaves room '{}'", peer_id, room);
                self.table.leave(&peer_id, &room)
            }
            RoomCommand::Disconnect { peer_id } => self.table.disconnect(&peer_id),
        };

        self.announce(announcements).await;
    }

    async fn announce(&self, announcements: Vec<Announcement>) {
        for Announcement { to, message } in announcements {
            if !self.signaling.send_signal(&to, message).await {
                warn!("Announcement for {} was dropped", to);
            }
        }
    }
}
