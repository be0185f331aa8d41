//! Batch planning.

use serde::Serialize;
use std::num::NonZeroUsize;
use trustroute_core::{Address, EnableTarget, OriginSource};

/// One execution unit: a bounded slice of a target's addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedBatch {
    /// Origin group the batch is enabled under.
    pub origin: Address,
    /// How the origin was attributed.
    pub source: OriginSource,
    /// At most `max_batch` addresses, in target order.
    pub addresses: Vec<Address>,
}

/// Split every target into consecutive batches of at most `max_batch` addresses.
///
/// Batch `i` of a target holds addresses `[i * n, (i + 1) * n)`; targets are
/// planned in order and never share a batch.
pub fn plan_batches(targets: &[EnableTarget], max_batch: NonZeroUsize) -> Vec<PlannedBatch> {
    targets
        .iter()
        .flat_map(|target| {
            target
                .addresses
                .chunks(max_batch.get())
                .map(move |chunk| PlannedBatch {
                    origin: target.origin,
                    source: target.source,
                    addresses: chunk.to_vec(),
                })
        })
        .collect()
}
