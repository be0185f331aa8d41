//! Eligibility pipeline.
//!
//! Reduces a discovery [`Snapshot`] to the origin-attributed addresses that
//! still need enabling:
//!
//! 1. deduplicate candidates
//! 2. screen registered candidates, then the group members not yet screened
//! 3. drop addresses the router already trusts or the ledger already records
//! 4. attribute each survivor to one origin (base group before fallback)
//! 5. skip human origins and re-check humanity of every survivor
//!
//! Order within an origin follows discovery order, so repeated runs over the
//! same ledger state produce the same plan.

use futures::{stream, StreamExt, TryStreamExt};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use tracing::{error, info, warn};
use trustroute_core::{Address, EnableTarget, OriginSource};

use crate::blacklist::BlacklistStage;
use crate::discovery::{Discovery, Snapshot};
use crate::error::{EngineError, Result};

/// Counters collected while filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EligibilityStats {
    /// Distinct candidates across all sources.
    pub discovered: usize,
    /// Candidates allowed by screening.
    pub allowed: usize,
    /// Candidates blacklisted by screening.
    pub blacklisted: usize,
    /// Allowed candidates already trusted by the router or recorded in the ledger.
    pub already_satisfied: usize,
    /// Survivors dropped because they are no longer human avatars.
    pub non_human: usize,
    /// Non-default origins skipped because they are human avatars.
    pub skipped_origins: usize,
    /// Addresses dropped together with a skipped origin.
    pub skipped_addresses: usize,
    /// Addresses left to enable.
    pub pending: usize,
}

/// Pipeline output.
#[derive(Debug, Clone, Default)]
pub struct Eligibility {
    /// Work per origin, base groups first, default-origin fallback last.
    pub targets: Vec<EnableTarget>,
    /// Filtering counters.
    pub stats: EligibilityStats,
}

/// Configured eligibility pipeline.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityPipeline {
    default_origin: Address,
    check_width: NonZeroUsize,
}

impl EligibilityPipeline {
    /// Create a pipeline attributing unmatched candidates to `default_origin`.
    pub fn new(default_origin: Address, check_width: NonZeroUsize) -> Self {
        Self {
            default_origin,
            check_width,
        }
    }

    /// Run every filter over `snapshot`.
    ///
    /// `enabled` is the idempotency ledger loaded at run start.
    pub async fn filter(
        &self,
        snapshot: &Snapshot,
        enabled: &HashSet<Address>,
        discovery: &Discovery<'_>,
        screening: &mut BlacklistStage<'_>,
    ) -> Result<Eligibility> {
        if discovery.classify_humanity(&self.default_origin).await? {
            return Err(EngineError::DefaultOriginIsHuman(self.default_origin));
        }

        let candidates = snapshot.candidates();
        let mut stats = EligibilityStats {
            discovered: candidates.len(),
            ..Default::default()
        };

        // Registered candidates first, then every group member in one pass so
        // chunking spans groups. Members screened as registrations are skipped.
        screening.classify(snapshot.registered.iter()).await?;
        let members: IndexSet<Address> = snapshot
            .groups
            .values()
            .flat_map(|members| members.iter().copied())
            .collect();
        screening.classify(members.iter()).await?;

        let mut survivors = HashSet::new();
        for address in &candidates {
            if screening.is_blacklisted(address) {
                stats.blacklisted += 1;
                continue;
            }
            stats.allowed += 1;

            // The trust set is checked first; a ledger hit covers addresses
            // whose trust edge is not yet visible to the ledger reader.
            if snapshot.router_trusts.contains(address) || enabled.contains(address) {
                stats.already_satisfied += 1;
                continue;
            }
            survivors.insert(*address);
        }

        let attributed = self.attribute(snapshot, &survivors);
        let mut targets = Vec::with_capacity(attributed.len());

        for (origin, (source, addresses)) in attributed {
            if origin != self.default_origin && discovery.classify_humanity(&origin).await? {
                error!(
                    "Origin group {} is registered as a human avatar, skipping {} address(es)",
                    origin,
                    addresses.len()
                );
                stats.skipped_origins += 1;
                stats.skipped_addresses += addresses.len();
                continue;
            }

            let humans = self.retain_humans(discovery, addresses).await?;
            stats.non_human += humans.dropped;
            if humans.kept.is_empty() {
                continue;
            }

            stats.pending += humans.kept.len();
            targets.push(EnableTarget {
                origin,
                addresses: humans.kept,
                source,
            });
        }

        info!(
            "Eligibility: discovered={} allowed={} blacklisted={} satisfied={} non_human={} pending={}",
            stats.discovered,
            stats.allowed,
            stats.blacklisted,
            stats.already_satisfied,
            stats.non_human,
            stats.pending
        );

        Ok(Eligibility { targets, stats })
    }

    /// Assign every survivor to exactly one origin.
    ///
    /// The first base group (in discovery order) that trusts an address wins;
    /// remaining registered survivors fall back to the default origin.
    fn attribute(
        &self,
        snapshot: &Snapshot,
        survivors: &HashSet<Address>,
    ) -> IndexMap<Address, (OriginSource, Vec<Address>)> {
        let mut assigned = HashSet::new();
        let mut by_origin: IndexMap<Address, (OriginSource, Vec<Address>)> = IndexMap::new();

        for (group, members) in &snapshot.groups {
            for member in members {
                if survivors.contains(member) && assigned.insert(*member) {
                    by_origin
                        .entry(*group)
                        .or_insert_with(|| (OriginSource::Grouped, Vec::new()))
                        .1
                        .push(*member);
                }
            }
        }

        for address in &snapshot.registered {
            if survivors.contains(address) && assigned.insert(*address) {
                by_origin
                    .entry(self.default_origin)
                    .or_insert_with(|| (OriginSource::Fallback, Vec::new()))
                    .1
                    .push(*address);
            }
        }

        by_origin
    }

    async fn retain_humans(
        &self,
        discovery: &Discovery<'_>,
        addresses: Vec<Address>,
    ) -> Result<HumanFilter> {
        let checked: Vec<(Address, bool)> = stream::iter(addresses)
            .map(|address| async move {
                let human = discovery.classify_humanity(&address).await?;
                Ok::<_, EngineError>((address, human))
            })
            .buffered(self.check_width.get())
            .try_collect()
            .await?;

        let mut filter = HumanFilter::default();
        for (address, human) in checked {
            if human {
                filter.kept.push(address);
            } else {
                warn!("{} is no longer a human avatar, not scheduling it", address);
                filter.dropped += 1;
            }
        }
        Ok(filter)
    }
}

#[derive(Default)]
struct HumanFilter {
    kept: Vec<Address>,
    dropped: usize,
}
