use crate::model::peer::PeerId;
use crate::model::signaling::SignalMessage;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("frame is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("frame has no string `type` field")]
    MissingType,
}

/// A signaling frame kept as a raw JSON object.
///
/// The relay forwards directed envelopes in this form, so fields it does not know
/// about reach the other peer untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEnvelope(Map<String, Value>);

impl RawEnvelope {
    pub const DIRECTED_KINDS: [&'static str; 3] = ["offer", "answer", "ice-candidate"];

    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        let Value::Object(map) = serde_json::from_str::<Value>(text)? else {
            return Err(EnvelopeError::NotAnObject);
        };
        if !matches!(map.get("type"), Some(Value::String(_))) {
            return Err(EnvelopeError::MissingType);
        }
        Ok(Self(map))
    }

    pub fn kind(&self) -> &str {
        self.0.get("type").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn is_directed(&self) -> bool {
        Self::DIRECTED_KINDS.contains(&self.kind())
    }

    pub fn target(&self) -> Option<PeerId> {
        ["to", "target"]
            .iter()
            .find_map(|key| self.0.get(*key).and_then(Value::as_str))
            .map(PeerId::from)
    }

    pub fn sender(&self) -> Option<PeerId> {
        self.0.get("from").and_then(Value::as_str).map(PeerId::from)
    }

    /// Stamps `from` unless the client already supplied one.
    pub fn fill_sender(&mut self, from: &PeerId) {
        if self.sender().is_none() {
            self.0
                .insert("from".to_owned(), Value::String(from.0.clone()));
        }
    }

    pub fn into_message(self) -> Result<SignalMessage, EnvelopeError> {
        Ok(serde_json::from_value(Value::Object(self.0))?)
    }

    pub fn into_frame(self) -> String {
        Value::Object(self.0).to_string()
    }
}

impl From<&SignalMessage> for RawEnvelope {
    fn from(msg: &SignalMessage) -> Self {
        match serde_json::to_value(msg) {
            Ok(Value::Object(map)) => Self(map),
            _ => {
                let mut map = Map::new();
                map.insert("type".to_owned(), Value::String(msg.kind().to_owned()));
                Self(map)
            }
        }
    }
}
