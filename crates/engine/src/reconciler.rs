//! Reconciliation run driver.
//!
//! One call to [`Reconciler::run`] walks the phases
//! `Discovering -> Filtering -> Planning -> Executing -> Completed | Failed`.
//! Nothing is resumable inside a run; a failed run is simply run again, and the
//! trust set and idempotency ledger make re-derivation cheap.
//!
//! Callers must not overlap runs against the same store.

use std::fmt;
use std::num::NonZeroUsize;
use tracing::{error, info};
use trustroute_core::Address;

use crate::blacklist::BlacklistStage;
use crate::discovery::{Discovery, SourceSelection};
use crate::error::Result;
use crate::executor::BatchExecutor;
use crate::outcome::RunOutcome;
use crate::pipeline::EligibilityPipeline;
use crate::planner::plan_batches;
use crate::traits::{BlacklistClassifier, IdempotencyStore, LedgerClient, MutationSink};

/// Default number of addresses per enablement transaction.
pub const DEFAULT_ENABLE_BATCH_SIZE: usize = 50;
/// Default ledger page size.
pub const DEFAULT_PAGE_SIZE: usize = 1000;
/// Default number of addresses per screening request.
pub const DEFAULT_BLACKLIST_CHUNK_SIZE: usize = 500;
/// Default number of concurrent classification lookups.
pub const DEFAULT_CHECK_WIDTH: usize = 20;

/// Run phase, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Querying the ledger.
    Discovering,
    /// Screening, exclusion and attribution.
    Filtering,
    /// Splitting targets into batches.
    Planning,
    /// Sending batches.
    Executing,
    /// Run finished.
    Completed,
    /// Run aborted.
    Failed,
}

impl RunPhase {
    /// Canonical lowercase string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Discovering => "discovering",
            RunPhase::Filtering => "filtering",
            RunPhase::Planning => "planning",
            RunPhase::Executing => "executing",
            RunPhase::Completed => "completed",
            RunPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine settings.
#[derive(Debug, Clone, Copy)]
pub struct ReconcilerConfig {
    /// Identity whose trust set is reconciled.
    pub router: Address,
    /// Origin group for candidates not covered by a base group.
    pub default_origin: Address,
    /// Compute everything but withhold mutations.
    pub simulate: bool,
    /// Maximum addresses per enablement transaction.
    pub enable_batch_size: NonZeroUsize,
    /// Ledger page size.
    pub page_size: NonZeroUsize,
    /// Maximum addresses per screening request.
    pub blacklist_chunk_size: NonZeroUsize,
    /// Maximum concurrent classification lookups.
    pub check_width: NonZeroUsize,
    /// Candidate sources.
    pub sources: SourceSelection,
}

impl ReconcilerConfig {
    /// Settings with default sizes and both sources enabled.
    pub fn new(router: Address, default_origin: Address) -> Self {
        Self {
            router,
            default_origin,
            simulate: false,
            enable_batch_size: non_zero(DEFAULT_ENABLE_BATCH_SIZE),
            page_size: non_zero(DEFAULT_PAGE_SIZE),
            blacklist_chunk_size: non_zero(DEFAULT_BLACKLIST_CHUNK_SIZE),
            check_width: non_zero(DEFAULT_CHECK_WIDTH),
            sources: SourceSelection::default(),
        }
    }
}

fn non_zero(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).unwrap_or(NonZeroUsize::MIN)
}

/// External collaborators for one run.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Ledger reader.
    pub ledger: &'a dyn LedgerClient,
    /// Screening service; `None` disables the blacklist stage.
    pub blacklist: Option<&'a dyn BlacklistClassifier>,
    /// Mutation sink; may be `None` in simulation mode.
    pub sink: Option<&'a dyn MutationSink>,
    /// Idempotency ledger.
    pub store: &'a dyn IdempotencyStore,
}

/// Reconciliation engine.
#[derive(Debug, Clone)]
pub struct Reconciler {
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Create an engine.
    pub fn new(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    /// Engine settings.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Run one full reconciliation.
    pub async fn run(&self, collaborators: Collaborators<'_>) -> Result<RunOutcome> {
        match self.run_phases(collaborators).await {
            Ok(outcome) => {
                info!(phase = %RunPhase::Completed, "Run complete: {}", outcome);
                Ok(outcome)
            }
            Err(e) => {
                error!(phase = %RunPhase::Failed, "Run failed: {:#}", e);
                Err(e)
            }
        }
    }

    async fn run_phases(&self, c: Collaborators<'_>) -> Result<RunOutcome> {
        let config = &self.config;

        info!(phase = %RunPhase::Discovering, router = %config.router, "Starting run");
        let enabled = c.store.load().await?;
        let discovery = Discovery::new(c.ledger);
        let snapshot = discovery
            .snapshot(config.sources, &config.router, config.page_size)
            .await?;

        info!(phase = %RunPhase::Filtering, "Filtering {} candidate(s)", snapshot.candidates().len());
        let mut screening =
            BlacklistStage::new(c.blacklist, config.blacklist_chunk_size, config.check_width);
        let eligibility = EligibilityPipeline::new(config.default_origin, config.check_width)
            .filter(&snapshot, &enabled, &discovery, &mut screening)
            .await?;

        info!(phase = %RunPhase::Planning, "Planning {} target(s)", eligibility.targets.len());
        let batches = plan_batches(&eligibility.targets, config.enable_batch_size);
        let planned = batches.len();

        info!(phase = %RunPhase::Executing, "Executing {} batch(es)", planned);
        let mut trust_set = snapshot.router_trusts.clone();
        let execution = BatchExecutor::new(c.sink, c.store, config.simulate)
            .execute(batches, &mut trust_set)
            .await?;

        Ok(RunOutcome::aggregate(
            snapshot.rejected,
            eligibility.stats,
            planned,
            execution,
            config.simulate,
        ))
    }
}
