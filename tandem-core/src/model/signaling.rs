use crate::model::peer::PeerId;
use crate::model::room::{Role, RoomId};
use crate::model::session::SessionTag;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// Connectivity candidate as exchanged on the wire. Same JSON shape as the browser's
/// `RTCIceCandidateInit`, so it can be handed to either side without translation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", default, skip_serializing_if = "Option::is_none")]
    pub sdp_mline_index: Option<u16>,
    #[serde(rename = "usernameFragment", default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_mline_index: None,
            username_fragment: None,
        }
    }
}

fn caller() -> Role {
    Role::Caller
}

fn callee() -> Role {
    Role::Callee
}

/// Every frame exchanged between a client and the relay.
///
/// `offer`, `answer` and `ice-candidate` are directed: the relay only looks at `to`
/// (or its legacy spelling `target`) and fills in `from`, everything else is opaque to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SignalMessage {
    Register {
        user_id: PeerId,
    },
    Registered {
        user_id: PeerId,
    },
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    JoinRoom {
        room: RoomId,
    },
    LeaveRoom {
        room: RoomId,
    },
    RoomFull {
        room: RoomId,
    },
    OtherUser {
        user_id: PeerId,
        #[serde(default = "caller")]
        role: Role,
    },
    UserJoined {
        user_id: PeerId,
        #[serde(default = "callee")]
        role: Role,
    },
    UserLeft {
        user_id: PeerId,
    },
    Offer {
        #[serde(alias = "target")]
        to: PeerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<SessionTag>,
        sdp: String,
    },
    Answer {
        #[serde(alias = "target")]
        to: PeerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<SessionTag>,
        sdp: String,
    },
    IceCandidate {
        #[serde(alias = "target")]
        to: PeerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<SessionTag>,
        candidate: IceCandidate,
    },
}

impl SignalMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            SignalMessage::Register { .. } => "register",
            SignalMessage::Registered { .. } => "registered",
            SignalMessage::IceConfig { .. } => "ice-config",
            SignalMessage::JoinRoom { .. } => "join-room",
            SignalMessage::LeaveRoom { .. } => "leave-room",
            SignalMessage::RoomFull { .. } => "room-full",
            SignalMessage::OtherUser { .. } => "other-user",
            SignalMessage::UserJoined { .. } => "user-joined",
            SignalMessage::UserLeft { .. } => "user-left",
            SignalMessage::Offer { .. } => "offer",
            SignalMessage::Answer { .. } => "answer",
            SignalMessage::IceCandidate { .. } => "ice-candidate",
        }
    }

    /// Sender of a directed envelope, as stamped by the relay.
    pub fn sender(&self) -> Option<&PeerId> {
        match self {
            SignalMessage::Offer { from, .. }
            | SignalMessage::Answer { from, .. }
            | SignalMessage::IceCandidate { from, .. } => from.as_ref(),
            _ => None,
        }
    }

    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
