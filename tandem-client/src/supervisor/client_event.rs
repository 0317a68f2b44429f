use anyhow::Result;
use tandem_core::{PeerId, Role, RoomId};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Disconnected,
    Connecting,
    InRoomWaiting,
    InRoomPaired,
    Left,
}

impl SupervisorState {
    pub fn in_room(self) -> bool {
        matches!(self, SupervisorState::InRoomWaiting | SupervisorState::InRoomPaired)
    }
}

/// What the application observes of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    StateChanged(SupervisorState),
    Registered(PeerId),
    Paired { peer: PeerId, role: Role },
    ChannelOpen,
    Message(String),
    ChannelError(String),
    ChannelClosed,
    PeerLeft(PeerId),
    RoomFull(RoomId),
    NegotiationFailed(String),
}

pub(crate) enum SupervisorCommand {
    Send {
        text: String,
        reply: oneshot::Sender<bool>,
    },
    Leave {
        reply: oneshot::Sender<()>,
    },
    Reconnect {
        reply: oneshot::Sender<Result<()>>,
    },
}
