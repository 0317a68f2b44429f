use std::time::Duration;
use tandem_core::utils::{DEFAULT_CHANNEL_LABEL, default_stun_urls};
use tandem_core::{IceServerConfig, PeerId, RoomId};

/// How long a paired session may take to open its data channel.
pub const DEFAULT_NEGOTIATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base url of the relay, e.g. `ws://127.0.0.1:3000`.
    pub signaling_url: String,
    pub room: RoomId,
    /// Stable id to register under; the relay assigns one when absent.
    pub peer_id: Option<PeerId>,
    /// Used until the relay pushes its own `ice-config`.
    pub ice_servers: Vec<IceServerConfig>,
    pub channel_label: String,
    /// Deadline from pairing to an open channel. A lost offer or answer ends the
    /// session once it passes.
    pub negotiation_timeout: Duration,
}

impl ClientConfig {
    pub fn new(signaling_url: impl Into<String>, room: impl Into<RoomId>) -> Self {
        Self {
            signaling_url: signaling_url.into(),
            room: room.into(),
            peer_id: None,
            ice_servers: vec![IceServerConfig {
                urls: default_stun_urls(),
                username: None,
                credential: None,
            }],
            channel_label: DEFAULT_CHANNEL_LABEL.to_owned(),
            negotiation_timeout: DEFAULT_NEGOTIATION_TIMEOUT,
        }
    }

    pub fn with_peer_id(mut self, peer_id: impl Into<PeerId>) -> Self {
        self.peer_id = Some(peer_id.into());
        self
    }

    pub fn with_ice_servers(mut self, ice_servers: Vec<IceServerConfig>) -> Self {
        self.ice_servers = ice_servers;
        self
    }

    pub fn with_negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout = timeout;
        self
    }

    /// Websocket endpoint to dial, `/ws` or `/ws/{peer_id}` under the base url.
    ///
    /// The id is percent-encoded into a single path segment.
    pub fn endpoint(&self) -> String {
        let base = self.signaling_url.trim_end_matches('/');
        let base = base.strip_suffix("/ws").unwrap_or(base);
        match &self.peer_id {
            Some(id) => format!("{}/ws/{}", base, urlencoding::encode(id.as_str())),
            None => format!("{}/ws", base),
        }
    }
}
