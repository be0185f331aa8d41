//! Periodic reconciliation service.
//!
//! Runs one reconciliation per tick. Runs never overlap: the next tick is only
//! awaited after the current run returns, and missed ticks are delayed rather
//! than bursted. A failed run is logged and retried on the next tick.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use trustroute_engine::{
    BlacklistClassifier, Collaborators, IdempotencyStore, LedgerClient, MutationSink,
    Reconciler, Result, RunOutcome,
};

/// Collaborators owned by the service.
#[derive(Clone)]
pub struct ServiceParts {
    /// Ledger reader
    pub ledger: Arc<dyn LedgerClient>,
    /// Screening client, if configured
    pub blacklist: Option<Arc<dyn BlacklistClassifier>>,
    /// Mutation sink, absent in dry-run mode
    pub sink: Option<Arc<dyn MutationSink>>,
    /// Idempotency ledger
    pub store: Arc<dyn IdempotencyStore>,
}

/// Periodic reconciliation driver.
#[derive(Clone)]
pub struct ReconcileService {
    reconciler: Reconciler,
    parts: ServiceParts,
    interval: Duration,
}

impl ReconcileService {
    /// Create a service running `reconciler` every `interval`.
    pub fn new(reconciler: Reconciler, parts: ServiceParts, interval: Duration) -> Self {
        Self {
            reconciler,
            parts,
            interval,
        }
    }

    /// Run a single reconciliation.
    pub async fn run_once(&self) -> Result<RunOutcome> {
        let collaborators = Collaborators {
            ledger: self.parts.ledger.as_ref(),
            blacklist: self.parts.blacklist.as_deref(),
            sink: self.parts.sink.as_deref(),
            store: self.parts.store.as_ref(),
        };
        self.reconciler.run(collaborators).await
    }

    /// Run forever, starting immediately.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!(
            "Reconcile service starting with interval: {:?} (dry run: {})",
            self.interval,
            self.reconciler.config().simulate
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            match self.run_once().await {
                Ok(outcome) if outcome.is_noop() => info!("Nothing to reconcile"),
                Ok(outcome) => info!("Reconciliation finished: {}", outcome),
                Err(e) => error!("Reconciliation failed, retrying next interval: {:#}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use trustroute_core::{canonical_string, Address};
    use trustroute_engine::{EngineError, MemoryStore, ReconcilerConfig};

    struct StaticLedger {
        registered: Vec<Address>,
        fail: bool,
    }

    #[async_trait]
    impl LedgerClient for StaticLedger {
        async fn list_base_groups(&self, _page_size: usize) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn list_trustees(&self, _truster: &Address) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn list_registered_candidates(
            &self,
            _page_size: usize,
        ) -> anyhow::Result<Vec<String>> {
            if self.fail {
                return Err(anyhow!("rpc unavailable"));
            }
            Ok(self.registered.iter().map(canonical_string).collect())
        }

        async fn is_human_avatar(&self, address: &Address) -> anyhow::Result<bool> {
            Ok(self.registered.contains(address))
        }
    }

    fn service(ledger: StaticLedger, simulate: bool) -> ReconcileService {
        let mut config =
            ReconcilerConfig::new(Address::repeat_byte(0xee), Address::repeat_byte(0xd0));
        config.simulate = simulate;

        ReconcileService::new(
            Reconciler::new(config),
            ServiceParts {
                ledger: Arc::new(ledger),
                blacklist: None,
                sink: None,
                store: Arc::new(MemoryStore::new()),
            },
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_run_once_dry_run() {
        let ledger = StaticLedger {
            registered: vec![Address::repeat_byte(1), Address::repeat_byte(2)],
            fail: false,
        };

        let outcome = service(ledger, true).run_once().await.unwrap();
        assert!(outcome.simulated);
        assert_eq!(outcome.pending, 2);
        assert_eq!(outcome.executed, 0);
        assert_eq!(outcome.simulated_batches.len(), 1);
    }

    #[tokio::test]
    async fn test_run_once_propagates_ledger_errors() {
        let ledger = StaticLedger {
            registered: Vec::new(),
            fail: true,
        };

        let err = service(ledger, true).run_once().await.unwrap_err();
        assert!(matches!(err, EngineError::Collaborator(_)));
        assert!(format!("{:#}", err).contains("rpc unavailable"));
    }

    #[tokio::test]
    async fn test_live_run_without_sink_fails() {
        let ledger = StaticLedger {
            registered: vec![Address::repeat_byte(1)],
            fail: false,
        };

        let err = service(ledger, false).run_once().await.unwrap_err();
        assert!(matches!(err, EngineError::MissingSink));
    }
}
