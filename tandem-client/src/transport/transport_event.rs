use crate::transport::ChannelTransport;
use std::fmt;
use std::sync::Arc;
use tandem_core::{IceCandidate, SessionTag};

/// Connection state reported by the native transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl PeerConnectionState {
    /// States after which the session cannot carry data anymore.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PeerConnectionState::Disconnected
                | PeerConnectionState::Failed
                | PeerConnectionState::Closed
        )
    }
}

pub enum TransportEvent {
    CandidateGenerated(IceCandidate),
    StateChanged(PeerConnectionState),
    ChannelOpen(Arc<dyn ChannelTransport>),
    ChannelMessage(String),
    ChannelError(String),
    ChannelClosed,
}

impl fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportEvent::CandidateGenerated(c) => {
                f.debug_tuple("CandidateGenerated").field(c).finish()
            }
            TransportEvent::StateChanged(s) => f.debug_tuple("StateChanged").field(s).finish(),
            TransportEvent::ChannelOpen(ch) => {
                f.debug_tuple("ChannelOpen").field(&ch.label()).finish()
            }
            TransportEvent::ChannelMessage(m) => {
                f.debug_tuple("ChannelMessage").field(&m.len()).finish()
            }
            TransportEvent::ChannelError(e) => f.debug_tuple("ChannelError").field(e).finish(),
            TransportEvent::ChannelClosed => f.write_str("ChannelClosed"),
        }
    }
}

/// A transport callback, tagged with the attempt that produced it.
#[derive(Debug)]
pub struct SessionEvent {
    pub session: SessionTag,
    pub event: TransportEvent,
}

impl SessionEvent {
    pub fn new(session: SessionTag, event: TransportEvent) -> Self {
        Self { session, event }
    }
}
