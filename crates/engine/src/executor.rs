//! Batch execution.
//!
//! Batches run strictly one after another. After each successful mutation the
//! batch is appended to the idempotency store before the next batch starts, so
//! a failure at batch `k` leaves batches `1..k` durably recorded and the rest
//! re-derivable by the next run.

use std::collections::HashSet;
use tracing::{error, info};
use trustroute_core::{Address, TxHash};

use crate::error::{EngineError, Result};
use crate::planner::PlannedBatch;
use crate::traits::{IdempotencyStore, MutationSink};

/// What the executor did.
#[derive(Debug, Clone, Default)]
pub struct Execution {
    /// Addresses enabled on-chain in this run.
    pub executed: usize,
    /// Transaction hashes of successful batches, in execution order.
    pub transaction_ids: Vec<TxHash>,
    /// Batches that would have been sent in simulation mode.
    pub simulated_batches: Vec<PlannedBatch>,
}

/// Sequential executor over planned batches.
pub struct BatchExecutor<'a> {
    sink: Option<&'a dyn MutationSink>,
    store: &'a dyn IdempotencyStore,
    simulate: bool,
}

impl<'a> BatchExecutor<'a> {
    /// Create an executor. `sink` may be `None` only in simulation mode.
    pub fn new(
        sink: Option<&'a dyn MutationSink>,
        store: &'a dyn IdempotencyStore,
        simulate: bool,
    ) -> Self {
        Self {
            sink,
            store,
            simulate,
        }
    }

    /// Execute `batches` in order, updating `trust_set` as batches succeed.
    pub async fn execute(
        &self,
        batches: Vec<PlannedBatch>,
        trust_set: &mut HashSet<Address>,
    ) -> Result<Execution> {
        let mut execution = Execution::default();
        let total = batches.len();

        if self.simulate {
            for (index, batch) in batches.into_iter().enumerate() {
                info!(
                    "[dry run] batch {}/{}: would enable {} address(es) under {} ({})",
                    index + 1,
                    total,
                    batch.addresses.len(),
                    batch.origin,
                    batch.source
                );
                execution.simulated_batches.push(batch);
            }
            return Ok(execution);
        }

        let sink = self.sink.ok_or(EngineError::MissingSink)?;

        for (index, batch) in batches.into_iter().enumerate() {
            let addresses: Vec<Address> = batch
                .addresses
                .iter()
                .filter(|a| !trust_set.contains(*a))
                .copied()
                .collect();

            if addresses.is_empty() {
                info!("Batch {}/{} already satisfied, skipping", index + 1, total);
                continue;
            }

            info!(
                "Batch {}/{}: enabling {} address(es) under {} ({})",
                index + 1,
                total,
                addresses.len(),
                batch.origin,
                batch.source
            );

            let tx_hash = match sink.enable_trust(&batch.origin, &addresses).await {
                Ok(tx_hash) => tx_hash,
                Err(e) => {
                    error!(
                        "Batch {}/{} failed after {} successful batch(es): {:#}",
                        index + 1,
                        total,
                        execution.transaction_ids.len(),
                        e
                    );
                    return Err(e.into());
                }
            };

            self.store.append(&addresses).await?;
            trust_set.extend(addresses.iter().copied());

            info!(
                "Batch {}/{} confirmed: tx={}",
                index + 1,
                total,
                tx_hash
            );
            execution.executed += addresses.len();
            execution.transaction_ids.push(tx_hash);
        }

        Ok(execution)
    }
}
