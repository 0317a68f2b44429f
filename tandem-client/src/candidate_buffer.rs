use crate::transport::CandidateSink;
use std::collections::VecDeque;
use tandem_core::IceCandidate;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateDisposition {
    Applied,
    Buffered,
    /// Remote description was set but the transport refused the candidate.
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub applied: usize,
    pub failed: usize,
}

/// Holds remote candidates until the remote description is applied, then drains them
/// in arrival order. Later arrivals go straight to the transport.
#[derive(Debug, Default)]
pub struct CandidateBuffer {
    pending: VecDeque<IceCandidate>,
    remote_applied: bool,
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_remote_applied(&self) -> bool {
        self.remote_applied
    }

    pub async fn add<S>(&mut self, sink: &S, candidate: IceCandidate) -> CandidateDisposition
    where
        S: CandidateSink + ?Sized,
    {
        if !self.remote_applied {
            self.pending.push_back(candidate);
            debug!("Buffered remote candidate ({} pending)", self.pending.len());
            return CandidateDisposition::Buffered;
        }

        match sink.add_ice_candidate(candidate).await {
            Ok(()) => CandidateDisposition::Applied,
            Err(e) => {
                warn!("Skipping remote candidate: {:#}", e);
                CandidateDisposition::Failed
            }
        }
    }

    /// Drains the queue exactly once; later calls are no-ops. A candidate the sink
    /// rejects is logged and skipped.
    pub async fn mark_remote_applied<S>(&mut self, sink: &S) -> DrainReport
    where
        S: CandidateSink + ?Sized,
    {
        let mut report = DrainReport::default();
        if self.remote_applied {
            return report;
        }
        self.remote_applied = true;

        while let Some(candidate) = self.pending.pop_front() {
            match sink.add_ice_candidate(candidate).await {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    warn!("Skipping buffered candidate: {:#}", e);
                    report.failed += 1;
                }
            }
        }

        debug!(
            "Drained candidate buffer: {} applied, {} failed",
            report.applied, report.failed
        );
        report
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.remote_applied = false;
    }
}
