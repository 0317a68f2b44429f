use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Tag of one negotiation attempt.
///
/// Minted by the caller for every fresh offer and echoed on the answer and on every
/// candidate, so that responses belonging to an abandoned attempt can be recognised.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct SessionTag(pub Uuid);

impl SessionTag {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionTag {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
