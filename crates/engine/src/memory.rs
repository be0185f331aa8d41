//! In-memory idempotency store.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;
use trustroute_core::Address;

use crate::traits::IdempotencyStore;

/// Process-local [`IdempotencyStore`]; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    enabled: RwLock<HashSet<Address>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded addresses.
    pub async fn len(&self) -> usize {
        self.enabled.read().await.len()
    }

    /// Whether nothing has been recorded.
    pub async fn is_empty(&self) -> bool {
        self.enabled.read().await.is_empty()
    }

    /// Whether `address` is recorded.
    pub async fn contains(&self, address: &Address) -> bool {
        self.enabled.read().await.contains(address)
    }
}

#[async_trait]
impl IdempotencyStore for MemoryStore {
    async fn load(&self) -> Result<HashSet<Address>> {
        Ok(self.enabled.read().await.clone())
    }

    async fn append(&self, addresses: &[Address]) -> Result<()> {
        self.enabled.write().await.extend(addresses.iter().copied());
        Ok(())
    }
}
