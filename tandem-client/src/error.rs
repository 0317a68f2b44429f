use crate::negotiator::NegotiationPhase;
use tandem_core::PeerId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The envelope is valid but arrives in a phase that cannot take it, such as a
    /// second offer for a session that is already stable.
    #[error("'{kind}' rejected in phase {phase:?}")]
    Rejected {
        kind: &'static str,
        phase: NegotiationPhase,
    },

    /// The envelope belongs to an abandoned attempt or to a peer we are not
    /// negotiating with.
    #[error("stale '{kind}' from {from} discarded")]
    Stale { kind: &'static str, from: PeerId },

    /// The native transport failed; the attempt is abandoned.
    #[error("transport failure: {0:#}")]
    Transport(#[from] anyhow::Error),
}

impl NegotiationError {
    /// Only transport failures end the attempt; everything else is ignored input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, NegotiationError::Transport(_))
    }
}
