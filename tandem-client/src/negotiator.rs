use crate::candidate_buffer::{CandidateBuffer, CandidateDisposition};
use crate::error::NegotiationError;
use crate::transport::{PeerTransport, SdpKind, SessionEvent, TransportFactory};
use anyhow::Result;
use std::collections::VecDeque;
use std::sync::Arc;
use tandem_core::{IceCandidate, IceServerConfig, PeerId, Role, SessionTag, SignalMessage};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationPhase {
    Idle,
    HaveLocalOffer,
    HaveRemoteOffer,
    Stable,
    Closed,
    Failed,
}

impl NegotiationPhase {
    pub fn is_finished(self) -> bool {
        matches!(self, NegotiationPhase::Closed | NegotiationPhase::Failed)
    }
}

/// Early candidates kept per attempt; older ones are dropped past this.
pub const MAX_EARLY_CANDIDATES: usize = 64;

/// Remote candidate that arrived before the offer it belongs to.
struct EarlyCandidate {
    from: PeerId,
    session: Option<SessionTag>,
    candidate: IceCandidate,
}

/// Offer/answer state machine for one connection attempt.
///
/// Each attempt gets a fresh transport from the factory and its own `SessionTag`;
/// every envelope and transport event is checked against the current tag, so
/// leftovers of an abandoned attempt are discarded instead of applied.
pub struct SessionNegotiator<F: TransportFactory> {
    factory: Arc<F>,
    events: mpsc::UnboundedSender<SessionEvent>,
    ice_servers: Vec<IceServerConfig>,
    channel_label: String,

    phase: NegotiationPhase,
    role: Option<Role>,
    remote: Option<PeerId>,
    /// Tags transport events of the current attempt.
    session: Option<SessionTag>,
    /// Tag carried on outgoing envelopes; `None` when the caller sent an untagged offer.
    wire_session: Option<SessionTag>,
    local_description: Option<String>,
    remote_description: Option<String>,
    candidates: CandidateBuffer,
    early: VecDeque<EarlyCandidate>,
    transport: Option<Arc<F::Transport>>,
}

impl<F: TransportFactory> SessionNegotiator<F> {
    pub fn new(
        factory: Arc<F>,
        events: mpsc::UnboundedSender<SessionEvent>,
        ice_servers: Vec<IceServerConfig>,
        channel_label: impl Into<String>,
    ) -> Self {
        Self {
            factory,
            events,
            ice_servers,
            channel_label: channel_label.into(),
            phase: NegotiationPhase::Idle,
            role: None,
            remote: None,
            session: None,
            wire_session: None,
            local_description: None,
            remote_description: None,
            candidates: CandidateBuffer::new(),
            early: VecDeque::new(),
            transport: None,
        }
    }

    /// Takes effect on the next attempt.
    pub fn set_ice_servers(&mut self, ice_servers: Vec<IceServerConfig>) {
        self.ice_servers = ice_servers;
    }

    pub fn ice_servers(&self) -> &[IceServerConfig] {
        &self.ice_servers
    }

    pub fn phase(&self) -> NegotiationPhase {
        self.phase
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn remote_peer(&self) -> Option<&PeerId> {
        self.remote.as_ref()
    }

    pub fn session(&self) -> Option<SessionTag> {
        self.session
    }

    pub fn local_description(&self) -> Option<&str> {
        self.local_description.as_deref()
    }

    pub fn remote_description(&self) -> Option<&str> {
        self.remote_description.as_deref()
    }

    /// Whether a transport event tagged `session` belongs to the live attempt.
    pub fn is_current_session(&self, session: SessionTag) -> bool {
        self.session == Some(session) && !self.phase.is_finished()
    }

    /// Records the peer announced by the room. Only meaningful while idle.
    pub fn expect_remote(&mut self, remote: PeerId, role: Role) {
        if self.phase != NegotiationPhase::Idle {
            warn!("Ignoring pairing with {} in phase {:?}", remote, self.phase);
            return;
        }
        self.remote = Some(remote);
        self.role = Some(role);
    }

    /// `idle -> have-local-offer`. Returns the directed offer to send.
    pub async fn start_as_caller(
        &mut self,
        remote: PeerId,
    ) -> Result<SignalMessage, NegotiationError> {
        self.ensure_phase("offer", NegotiationPhase::Idle)?;

        let session = SessionTag::new();
        self.role = Some(Role::Caller);
        self.remote = Some(remote.clone());
        self.session = Some(session);
        self.wire_session = Some(session);
        // Only the callee can receive candidates before it knows the session.
        self.early.clear();

        let sdp = match self.create_local_offer(session).await {
            Ok(sdp) => sdp,
            Err(e) => return Err(self.abandon(e).await),
        };
        self.local_description = Some(sdp.clone());
        self.phase = NegotiationPhase::HaveLocalOffer;
        info!("Sending offer to {} (session {})", remote, session);

        Ok(SignalMessage::Offer {
            to: remote,
            from: None,
            session: Some(session),
            sdp,
        })
    }

    /// `idle -> have-remote-offer -> stable`. Returns the directed answer to send.
    pub async fn accept_offer(
        &mut self,
        from: PeerId,
        session: Option<SessionTag>,
        sdp: String,
    ) -> Result<SignalMessage, NegotiationError> {
        self.ensure_phase("offer", NegotiationPhase::Idle)?;
        if self.remote.as_ref().is_some_and(|remote| *remote != from) {
            return Err(NegotiationError::Stale { kind: "offer", from });
        }

        let local_tag = session.unwrap_or_default();
        self.role = Some(Role::Callee);
        self.remote = Some(from.clone());
        self.session = Some(local_tag);
        self.wire_session = session;

        let sdp = match self.answer_remote_offer(local_tag, sdp).await {
            Ok(sdp) => sdp,
            Err(e) => return Err(self.abandon(e).await),
        };
        self.local_description = Some(sdp.clone());
        self.phase = NegotiationPhase::Stable;
        info!("Answering offer from {} (session {})", from, local_tag);

        Ok(SignalMessage::Answer {
            to: from,
            from: None,
            session,
            sdp,
        })
    }

    /// `have-local-offer -> stable`.
    pub async fn apply_answer(
        &mut self,
        from: PeerId,
        session: Option<SessionTag>,
        sdp: String,
    ) -> Result<(), NegotiationError> {
        if !self.is_current_sender(&from, session) {
            return Err(NegotiationError::Stale { kind: "answer", from });
        }
        self.ensure_phase("answer", NegotiationPhase::HaveLocalOffer)?;

        let Some(transport) = self.transport.clone() else {
            return Err(NegotiationError::Rejected {
                kind: "answer",
                phase: self.phase,
            });
        };
        if let Err(e) = transport.set_remote_description(SdpKind::Answer, sdp.clone()).await {
            return Err(self.abandon(e).await);
        }
        self.remote_description = Some(sdp);
        self.candidates.mark_remote_applied(transport.as_ref()).await;
        self.phase = NegotiationPhase::Stable;
        info!("Answer from {} applied, session stable", from);
        Ok(())
    }

    /// Applies or buffers a remote candidate, whatever the phase.
    pub async fn add_remote_candidate(
        &mut self,
        from: PeerId,
        session: Option<SessionTag>,
        candidate: IceCandidate,
    ) -> Result<CandidateDisposition, NegotiationError> {
        if self.phase.is_finished() {
            return Err(NegotiationError::Rejected {
                kind: "ice-candidate",
                phase: self.phase,
            });
        }

        let Some(transport) = self.transport.clone() else {
            if self.remote.as_ref().is_some_and(|remote| *remote != from) {
                return Err(NegotiationError::Stale {
                    kind: "ice-candidate",
                    from,
                });
            }
            debug!("Holding candidate from {} until its offer arrives", from);
            if self.early.len() == MAX_EARLY_CANDIDATES {
                if let Some(dropped) = self.early.pop_front() {
                    warn!(
                        "Too many early candidates, dropping the oldest from {}",
                        dropped.from
                    );
                }
            }
            self.early.push_back(EarlyCandidate {
                from,
                session,
                candidate,
            });
            return Ok(CandidateDisposition::Buffered);
        };

        if !self.is_current_sender(&from, session) {
            return Err(NegotiationError::Stale {
                kind: "ice-candidate",
                from,
            });
        }
        Ok(self.candidates.add(transport.as_ref(), candidate).await)
    }

    /// Wraps a locally gathered candidate into a directed envelope, or `None` when it
    /// belongs to an abandoned attempt.
    pub fn local_candidate(
        &self,
        session: SessionTag,
        candidate: IceCandidate,
    ) -> Option<SignalMessage> {
        if !self.is_current_session(session) {
            return None;
        }
        let to = self.remote.clone()?;
        Some(SignalMessage::IceCandidate {
            to,
            from: None,
            session: self.wire_session,
            candidate,
        })
    }

    /// Moves to `closed` and releases the transport. Idempotent.
    pub async fn close(&mut self) {
        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                warn!("Error closing transport: {:#}", e);
            }
        }
        if self.phase != NegotiationPhase::Failed {
            self.phase = NegotiationPhase::Closed;
        }
    }

    /// Closes the current attempt and returns to a clean `idle`.
    pub async fn reset(&mut self) {
        self.close().await;
        self.phase = NegotiationPhase::Idle;
        self.role = None;
        self.remote = None;
        self.session = None;
        self.wire_session = None;
        self.local_description = None;
        self.remote_description = None;
        self.candidates.reset();
        self.early.clear();
    }

    async fn create_local_offer(&mut self, session: SessionTag) -> Result<String> {
        let transport = self.new_transport(session).await?;
        transport.create_offer(&self.channel_label).await
    }

    async fn answer_remote_offer(&mut self, session: SessionTag, sdp: String) -> Result<String> {
        let transport = self.new_transport(session).await?;

        transport.set_remote_description(SdpKind::Offer, sdp.clone()).await?;
        self.remote_description = Some(sdp);
        self.phase = NegotiationPhase::HaveRemoteOffer;

        for early in std::mem::take(&mut self.early) {
            if self.is_current_sender(&early.from, early.session) {
                self.candidates.add(transport.as_ref(), early.candidate).await;
            } else {
                debug!("Dropping early candidate from {}", early.from);
            }
        }
        self.candidates.mark_remote_applied(transport.as_ref()).await;

        transport.create_answer().await
    }

    async fn new_transport(&mut self, session: SessionTag) -> Result<Arc<F::Transport>> {
        let transport = self
            .factory
            .create(session, &self.ice_servers, self.events.clone())
            .await?;
        self.transport = Some(Arc::clone(&transport));
        Ok(transport)
    }

    async fn abandon(&mut self, err: anyhow::Error) -> NegotiationError {
        error!("Negotiation failed in phase {:?}: {:#}", self.phase, err);
        self.close().await;
        self.phase = NegotiationPhase::Failed;
        NegotiationError::Transport(err)
    }

    fn ensure_phase(
        &self,
        kind: &'static str,
        expected: NegotiationPhase,
    ) -> Result<(), NegotiationError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(NegotiationError::Rejected {
                kind,
                phase: self.phase,
            })
        }
    }

    /// Untagged envelopes are accepted as long as the sender matches.
    fn is_current_sender(&self, from: &PeerId, session: Option<SessionTag>) -> bool {
        if self.remote.as_ref() != Some(from) {
            return false;
        }
        match (session, self.wire_session) {
            (Some(incoming), Some(current)) => incoming == current,
            _ => true,
        }
    }
}
