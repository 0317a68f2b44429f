mod envelope;
mod peer;
mod room;
mod session;
mod signaling;

pub use envelope::{EnvelopeError, RawEnvelope};
pub use peer::PeerId;
pub use room::{Role, RoomId};
pub use session::SessionTag;
pub use signaling::{IceCandidate, IceServerConfig, SignalMessage};
