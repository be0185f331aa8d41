//! Run outcome report.

use serde::Serialize;
use std::fmt;
use trustroute_core::TxHash;

use crate::executor::Execution;
use crate::pipeline::EligibilityStats;
use crate::planner::PlannedBatch;

/// Summary of one reconciliation run.
///
/// Produced once at the end of a successful run, including runs where nothing
/// needed enabling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    /// Distinct candidates discovered.
    pub discovered: usize,
    /// Ledger tokens rejected by canonicalization.
    pub rejected: usize,
    /// Candidates allowed by screening.
    pub allowed: usize,
    /// Candidates blacklisted by screening.
    pub blacklisted: usize,
    /// Allowed candidates needing no action.
    pub already_satisfied: usize,
    /// Survivors dropped by the humanity re-check.
    pub non_human: usize,
    /// Origins skipped because they are human avatars.
    pub skipped_origins: usize,
    /// Addresses dropped with skipped origins.
    pub skipped_addresses: usize,
    /// Addresses scheduled for enabling.
    pub pending: usize,
    /// Number of planned batches.
    pub planned_batches: usize,
    /// Addresses enabled on-chain.
    pub executed: usize,
    /// Hashes of confirmed transactions.
    pub transaction_ids: Vec<TxHash>,
    /// Whether mutations were withheld.
    pub simulated: bool,
    /// Batches that would have been sent (simulation only).
    pub simulated_batches: Vec<PlannedBatch>,
}

impl RunOutcome {
    /// Aggregate filtering counters and execution results.
    pub fn aggregate(
        rejected: usize,
        stats: EligibilityStats,
        planned_batches: usize,
        execution: Execution,
        simulated: bool,
    ) -> Self {
        Self {
            discovered: stats.discovered,
            rejected,
            allowed: stats.allowed,
            blacklisted: stats.blacklisted,
            already_satisfied: stats.already_satisfied,
            non_human: stats.non_human,
            skipped_origins: stats.skipped_origins,
            skipped_addresses: stats.skipped_addresses,
            pending: stats.pending,
            planned_batches,
            executed: execution.executed,
            transaction_ids: execution.transaction_ids,
            simulated,
            simulated_batches: execution.simulated_batches,
        }
    }

    /// True when the run found nothing to enable.
    pub fn is_noop(&self) -> bool {
        self.pending == 0
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "discovered={} allowed={} blacklisted={} satisfied={} non_human={} pending={} batches={} executed={} txs={}",
            self.discovered,
            self.allowed,
            self.blacklisted,
            self.already_satisfied,
            self.non_human,
            self.pending,
            self.planned_batches,
            self.executed,
            self.transaction_ids.len()
        )?;
        if self.simulated {
            write!(f, " (dry run)")?;
        }
        Ok(())
    }
}
