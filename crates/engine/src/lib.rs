//! Router trust reconciliation engine.
//!
//! Given the candidates reachable through base-group trust edges and
//! registration logs, the engine computes which addresses the router still has
//! to trust, splits them into bounded per-origin batches and sends them through
//! a [`MutationSink`], recording each success in an [`IdempotencyStore`].
//!
//! ```text
//! Discovery ──► Eligibility ──► Planner ──► Executor ──► RunOutcome
//!  (ledger)     (screening,      (chunks)    (sink +
//!               exclusion,                    store)
//!               attribution)
//! ```
//!
//! All external I/O goes through the traits in [`traits`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blacklist;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod memory;
pub mod outcome;
pub mod pipeline;
pub mod planner;
pub mod reconciler;
pub mod traits;

pub use blacklist::BlacklistStage;
pub use discovery::{Discovery, HumanityCache, Snapshot, SourceSelection};
pub use error::{EngineError, Result};
pub use executor::{BatchExecutor, Execution};
pub use memory::MemoryStore;
pub use outcome::RunOutcome;
pub use pipeline::{Eligibility, EligibilityPipeline, EligibilityStats};
pub use planner::{plan_batches, PlannedBatch};
pub use reconciler::{Collaborators, Reconciler, ReconcilerConfig, RunPhase};
pub use traits::{BlacklistClassifier, IdempotencyStore, LedgerClient, MutationSink};
