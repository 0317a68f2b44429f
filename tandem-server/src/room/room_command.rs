use tandem_core::{PeerId, RoomId};

/// Commands sent to the room coordinator by the signaling layer.
#[derive(Debug)]
pub enum RoomCommand {
    /// The peer asked to join a named room.
    Join { peer_id: PeerId, room: RoomId },

    /// The peer explicitly left a room.
    Leave { peer_id: PeerId, room: RoomId },

    /// The peer's socket went away; it leaves whatever room it was in.
    Disconnect { peer_id: PeerId },
}
