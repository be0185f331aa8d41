//! Error types for the reconciliation engine.

use trustroute_core::Address;
use thiserror::Error;

/// Reasons a reconciliation run aborts.
///
/// Item-level problems (malformed addresses, missing verdicts, human
/// non-default origins) never surface here; they are logged and counted.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The configured default origin group is a human avatar.
    #[error("default origin group {0} is registered as a human avatar, refusing to route through it")]
    DefaultOriginIsHuman(Address),

    /// Live execution was requested but no mutation sink was supplied.
    #[error("live execution requires a mutation sink (enable dry run or configure a signer)")]
    MissingSink,

    /// A ledger, screening, mutation or storage collaborator failed.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

/// Result type alias for EngineError.
pub type Result<T> = std::result::Result<T, EngineError>;
