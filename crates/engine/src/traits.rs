//! Collaborator interfaces consumed by the engine.
//!
//! Implementations live outside this crate (RPC, HTTP, signing, storage). All of
//! them return `anyhow::Result`; the engine propagates those errors unchanged.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use trustroute_core::{Address, RawVerdict, TxHash};

/// Read access to the trust-graph ledger.
///
/// Addresses are returned as raw tokens and canonicalized by the engine.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// All base groups, paginated internally until exhaustion.
    async fn list_base_groups(&self, page_size: usize) -> Result<Vec<String>>;

    /// Identities currently trusted by `truster`.
    async fn list_trustees(&self, truster: &Address) -> Result<Vec<String>>;

    /// Registered human avatars in ledger order, paginated internally.
    async fn list_registered_candidates(&self, page_size: usize) -> Result<Vec<String>>;

    /// Whether `address` is registered as a human avatar.
    async fn is_human_avatar(&self, address: &Address) -> Result<bool>;
}

/// Blacklist screening service.
#[async_trait]
pub trait BlacklistClassifier: Send + Sync {
    /// Classify a chunk of addresses. Addresses without a returned verdict are allowed.
    async fn classify(&self, addresses: &[Address]) -> Result<Vec<RawVerdict>>;
}

/// State-mutation interface of the router.
#[async_trait]
pub trait MutationSink: Send + Sync {
    /// Enable routing for `addresses` under `origin`. All-or-nothing per call.
    async fn enable_trust(&self, origin: &Address, addresses: &[Address]) -> Result<TxHash>;
}

/// Durable record of addresses whose enablement already succeeded.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Load every recorded address.
    async fn load(&self) -> Result<HashSet<Address>>;

    /// Record addresses; must be durable before returning.
    async fn append(&self, addresses: &[Address]) -> Result<()>;
}
