use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a rendezvous room. Rooms exist only while occupied.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Negotiation role handed out by the room coordinator when two peers are paired.
///
/// The occupant that was already waiting becomes the caller and produces the offer;
/// the peer that just arrived is the callee and waits for it.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Caller,
    Callee,
}
