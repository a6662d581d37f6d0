//! Reasoner statistics: a session-local, resettable counters record.
//!
//! Grounded on the teacher's `pipeline_trace` stats-record pattern: one flat
//! struct of counters updated in place, exposed via `Session::stats(reset)`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonerStats {
    pub queries: u64,
    pub proofs: u64,
    pub kb_scans: u64,
    pub similarity_checks: u64,
    pub rule_attempts: u64,
    pub transitive_steps: u64,
    pub max_proof_depth: u64,
    pub min_proof_depth: u64,
    pub total_proof_steps: u64,
}

impl ReasonerStats {
    #[must_use]
    pub fn new() -> Self {
        ReasonerStats::default()
    }

    pub fn reset(&mut self) {
        *self = ReasonerStats::default();
    }

    pub(crate) fn record_proof_depth(&mut self, depth: u64) {
        if self.max_proof_depth == 0 && self.min_proof_depth == 0 && self.proofs == 0 {
            self.min_proof_depth = depth;
        }
        self.max_proof_depth = self.max_proof_depth.max(depth);
        self.min_proof_depth = self.min_proof_depth.min(depth);
    }
}
