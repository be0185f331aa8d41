//! Candidate discovery.
//!
//! Turns raw ledger listings into canonical, deduplicated, order-preserving
//! collections. Malformed tokens are counted and skipped; ledger errors abort.

use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};
use trustroute_core::{canonicalize_all, Address};

use crate::error::Result;
use crate::traits::LedgerClient;

/// Which candidate sources feed the eligibility pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSelection {
    /// Registered human avatars, attributed to the default origin.
    pub registrations: bool,
    /// Members of base groups, attributed to the base group that trusts them.
    pub base_groups: bool,
}

impl Default for SourceSelection {
    fn default() -> Self {
        Self {
            registrations: true,
            base_groups: true,
        }
    }
}

/// Everything one run learns from the ledger before filtering starts.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Registered candidates in ledger order.
    pub registered: IndexSet<Address>,
    /// Base group -> members, both in discovery order.
    pub groups: IndexMap<Address, IndexSet<Address>>,
    /// Addresses the router already trusts.
    pub router_trusts: HashSet<Address>,
    /// Tokens that failed canonicalization.
    pub rejected: usize,
}

impl Snapshot {
    /// Every distinct candidate: registered first, then group members.
    pub fn candidates(&self) -> IndexSet<Address> {
        let mut all = self.registered.clone();
        for members in self.groups.values() {
            all.extend(members.iter().copied());
        }
        all
    }
}

/// Discovery adapter over a [`LedgerClient`].
pub struct Discovery<'a> {
    ledger: &'a dyn LedgerClient,
    humanity: HumanityCache<'a>,
    rejected: AtomicUsize,
}

impl<'a> Discovery<'a> {
    /// Create an adapter with a fresh humanity cache.
    pub fn new(ledger: &'a dyn LedgerClient) -> Self {
        Self {
            ledger,
            humanity: HumanityCache::new(ledger),
            rejected: AtomicUsize::new(0),
        }
    }

    /// Number of tokens rejected so far.
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::Relaxed)
    }

    /// The per-run humanity cache.
    pub fn humanity(&self) -> &HumanityCache<'a> {
        &self.humanity
    }

    fn normalize(&self, what: &str, raw: Vec<String>) -> IndexSet<Address> {
        let parsed = canonicalize_all(raw);
        if !parsed.rejected.is_empty() {
            warn!(
                "Skipping {} malformed address(es) in {}: {:?}",
                parsed.rejected.len(),
                what,
                parsed.rejected
            );
            self.rejected
                .fetch_add(parsed.rejected.len(), Ordering::Relaxed);
        }
        parsed.accepted.into_iter().collect()
    }

    /// List all base groups.
    pub async fn list_base_groups(&self, page_size: NonZeroUsize) -> Result<IndexSet<Address>> {
        let raw = self.ledger.list_base_groups(page_size.get()).await?;
        let groups = self.normalize("base group listing", raw);
        if groups.is_empty() {
            info!("No base groups found on the ledger");
        }
        Ok(groups)
    }

    /// List the identities trusted by `truster`.
    pub async fn list_trustees(&self, truster: &Address) -> Result<IndexSet<Address>> {
        let raw = self.ledger.list_trustees(truster).await?;
        Ok(self.normalize("trustee listing", raw))
    }

    /// List registered candidates in ledger order.
    pub async fn list_registered_candidates(
        &self,
        page_size: NonZeroUsize,
    ) -> Result<IndexSet<Address>> {
        let raw = self.ledger.list_registered_candidates(page_size.get()).await?;
        let registered = self.normalize("registration listing", raw);
        if registered.is_empty() {
            info!("No registered candidates found on the ledger");
        }
        Ok(registered)
    }

    /// Memoized humanity check.
    pub async fn classify_humanity(&self, address: &Address) -> Result<bool> {
        self.humanity.is_human(address).await
    }

    /// Query every enabled source plus the router's own trust set.
    pub async fn snapshot(
        &self,
        sources: SourceSelection,
        router: &Address,
        page_size: NonZeroUsize,
    ) -> Result<Snapshot> {
        let registered = if sources.registrations {
            self.list_registered_candidates(page_size).await?
        } else {
            IndexSet::new()
        };

        let mut groups = IndexMap::new();
        if sources.base_groups {
            for group in self.list_base_groups(page_size).await? {
                let members = self.list_trustees(&group).await?;
                debug!("Base group {} trusts {} member(s)", group, members.len());
                groups.insert(group, members);
            }
        }

        let router_trusts: HashSet<Address> =
            self.list_trustees(router).await?.into_iter().collect();

        info!(
            "Discovery complete: {} registered, {} base group(s), router trusts {}",
            registered.len(),
            groups.len(),
            router_trusts.len()
        );

        Ok(Snapshot {
            registered,
            groups,
            router_trusts,
            rejected: self.rejected(),
        })
    }
}

/// Per-run memo of humanity lookups.
///
/// Each address maps to a shared cell, so concurrent checks of the same
/// address wait on a single in-flight query. A failed lookup leaves the cell
/// empty and is retried by the next caller.
pub struct HumanityCache<'a> {
    ledger: &'a dyn LedgerClient,
    entries: Mutex<HashMap<Address, Arc<OnceCell<bool>>>>,
}

impl<'a> HumanityCache<'a> {
    /// Create an empty cache.
    pub fn new(ledger: &'a dyn LedgerClient) -> Self {
        Self {
            ledger,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `address` is a human avatar.
    pub async fn is_human(&self, address: &Address) -> Result<bool> {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(*address).or_default().clone()
        };

        let human = cell
            .get_or_try_init(|| self.ledger.is_human_avatar(address))
            .await?;
        Ok(*human)
    }

    /// Number of distinct addresses looked up.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether no lookup happened yet.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
