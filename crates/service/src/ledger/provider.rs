//! Circles RPC ledger client.

use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::sol;
use alloy::transports::http::{Client, Http};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use trustroute_core::canonical_string;
use trustroute_engine::LedgerClient;

use super::query::{
    page_request, Filter, QueryResult, TableRef, BASE_GROUPS, REGISTRATIONS, TRUST_RELATIONS,
};

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract Hub {
        function isHuman(address _human) external view returns (bool);
    }
}

/// Ledger client over a Circles RPC endpoint.
#[derive(Clone)]
pub struct CirclesRpc {
    provider: RootProvider<Http<Client>>,
    hub: Hub::HubInstance<Http<Client>, RootProvider<Http<Client>>>,
    trustee_page_size: usize,
}

impl CirclesRpc {
    /// Create a client for `rpc_url` using the hub at `hub`.
    ///
    /// `trustee_page_size` bounds trust relation pages.
    pub fn new(rpc_url: &str, hub: Address, trustee_page_size: usize) -> Result<Self> {
        let url = rpc_url
            .parse()
            .with_context(|| format!("Invalid RPC URL: {}", rpc_url))?;

        let provider = ProviderBuilder::new().on_http(url);
        let hub = Hub::new(hub, provider.clone());

        Ok(Self {
            provider,
            hub,
            trustee_page_size: trustee_page_size.max(1),
        })
    }

    /// Latest block number, used as a connectivity check.
    pub async fn get_block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .context("Failed to get block number")
    }

    async fn query_all(
        &self,
        table: &TableRef,
        filters: &[Filter],
        page_size: usize,
    ) -> Result<Vec<String>> {
        let page_size = page_size.max(1);
        let mut tokens = Vec::new();
        let mut cursor = None;

        loop {
            let request = page_request(table, filters, cursor.as_ref(), page_size);
            let raw: Value = self
                .provider
                .raw_request("circles_query".into(), vec![request])
                .await
                .with_context(|| {
                    format!("circles_query failed for {}.{}", table.namespace, table.table)
                })?;

            let page = QueryResult::from_value(raw)?.into_page(table.column)?;
            debug!(
                "{}.{}: fetched {} row(s)",
                table.namespace, table.table, page.row_count
            );

            tokens.extend(page.tokens);
            match page.last {
                Some(last) if page.row_count >= page_size => cursor = Some(last),
                _ => break,
            }
        }

        Ok(tokens)
    }
}

#[async_trait]
impl LedgerClient for CirclesRpc {
    async fn list_base_groups(&self, page_size: usize) -> Result<Vec<String>> {
        self.query_all(&BASE_GROUPS, &[], page_size).await
    }

    async fn list_trustees(&self, truster: &Address) -> Result<Vec<String>> {
        let filters = [Filter::equals("truster", canonical_string(truster))];
        self.query_all(&TRUST_RELATIONS, &filters, self.trustee_page_size)
            .await
    }

    async fn list_registered_candidates(&self, page_size: usize) -> Result<Vec<String>> {
        self.query_all(&REGISTRATIONS, &[], page_size).await
    }

    async fn is_human_avatar(&self, address: &Address) -> Result<bool> {
        let is_human = self
            .hub
            .isHuman(*address)
            .call()
            .await
            .with_context(|| format!("isHuman call failed for {}", address))?
            ._0;
        Ok(is_human)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_url() {
        assert!(CirclesRpc::new("not a url", Address::ZERO, 10).is_err());
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        let client = CirclesRpc::new("http://localhost:8545", Address::ZERO, 0).unwrap();
        assert_eq!(client.trustee_page_size, 1);
    }
}
