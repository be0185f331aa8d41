//! Enabled-address ledger operations.

use super::Storage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::warn;
use trustroute_core::{canonical_string, canonicalize, Address};
use trustroute_engine::IdempotencyStore;

impl Storage {
    /// All addresses recorded as enabled. Unparsable rows are skipped.
    pub async fn load_enabled(&self) -> Result<HashSet<Address>> {
        let rows: Vec<String> = sqlx::query_scalar("SELECT address FROM enabled_addresses")
            .fetch_all(&self.pool)
            .await
            .context("Failed to load enabled addresses")?;

        let mut enabled = HashSet::with_capacity(rows.len());
        for raw in rows {
            match canonicalize(&raw) {
                Ok(address) => {
                    enabled.insert(address);
                }
                Err(e) => warn!("Skipping stored address {:?}: {}", raw, e),
            }
        }
        Ok(enabled)
    }

    /// Record `addresses` as enabled in one transaction.
    ///
    /// Already-recorded addresses keep their first timestamp.
    pub async fn record_enabled(&self, addresses: &[Address]) -> Result<()> {
        if addresses.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        for address in addresses {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO enabled_addresses (address, enabled_at)
                VALUES (?, ?)
                "#,
            )
            .bind(canonical_string(address))
            .bind(now)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to record enabled address {}", address))?;
        }

        tx.commit()
            .await
            .context("Failed to commit enabled addresses")?;

        Ok(())
    }

    /// Whether `address` is recorded as enabled.
    pub async fn is_enabled(&self, address: &Address) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM enabled_addresses WHERE address = ?")
                .bind(canonical_string(address))
                .fetch_optional(&self.pool)
                .await
                .context("Failed to query enabled address")?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl IdempotencyStore for Storage {
    async fn load(&self) -> Result<HashSet<Address>> {
        self.load_enabled().await
    }

    async fn append(&self, addresses: &[Address]) -> Result<()> {
        self.record_enabled(addresses).await
    }
}
