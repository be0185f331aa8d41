//! Router mutation sink.
//!
//! Sends `enableCRCForRouting(baseGroup, crc[])` transactions to the router
//! contract and waits for a successful receipt.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::ProviderBuilder;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};
use trustroute_core::TxHash;
use trustroute_engine::MutationSink;

// Alloy provider with recommended fillers and a local wallet
type WalletProvider = alloy::providers::fillers::FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::fillers::JoinFill<
            alloy::providers::Identity,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::GasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::BlobGasFiller,
                    alloy::providers::fillers::JoinFill<
                        alloy::providers::fillers::NonceFiller,
                        alloy::providers::fillers::ChainIdFiller,
                    >,
                >,
            >,
        >,
        alloy::providers::fillers::WalletFiller<EthereumWallet>,
    >,
    alloy::providers::RootProvider<alloy::transports::http::Http<alloy::transports::http::Client>>,
    alloy::transports::http::Http<alloy::transports::http::Client>,
    alloy::network::Ethereum,
>;

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract BaseGroupRouter {
        function enableCRCForRouting(address baseGroup, address[] calldata crc) external;
    }
}

/// Parse a hex private key (optional 0x prefix).
pub fn parse_signer(private_key: &str) -> Result<PrivateKeySigner> {
    private_key
        .trim()
        .trim_start_matches("0x")
        .parse::<PrivateKeySigner>()
        .context("Failed to parse signer private key")
}

/// Mutation sink backed by the router contract.
pub struct RouterSink {
    contract: BaseGroupRouter::BaseGroupRouterInstance<
        alloy::transports::http::Http<alloy::transports::http::Client>,
        WalletProvider,
    >,
    sender: Address,
}

impl RouterSink {
    /// Create a sink signing with `signer` against the router at `router`.
    pub fn new(rpc_url: &str, signer: PrivateKeySigner, router: Address) -> Result<Self> {
        let sender = signer.address();
        let wallet = EthereumWallet::from(signer);

        let url = rpc_url
            .parse()
            .with_context(|| format!("Invalid RPC URL: {}", rpc_url))?;
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(url);

        let contract = BaseGroupRouter::new(router, provider);

        Ok(Self { contract, sender })
    }

    /// Address transactions are sent from.
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Router contract address.
    pub fn router(&self) -> Address {
        *self.contract.address()
    }
}

#[async_trait]
impl MutationSink for RouterSink {
    async fn enable_trust(&self, origin: &Address, addresses: &[Address]) -> Result<TxHash> {
        let tx = self
            .contract
            .enableCRCForRouting(*origin, addresses.to_vec())
            .send()
            .await
            .context("Failed to send enableCRCForRouting transaction")?;

        info!("Transaction sent: {}", tx.tx_hash());

        let receipt = tx
            .get_receipt()
            .await
            .context("Failed to get transaction receipt")?;

        if !receipt.status() {
            warn!(
                "Transaction reverted: {} in block {} (gas used: {})",
                receipt.transaction_hash,
                receipt.block_number.unwrap_or_default(),
                receipt.gas_used
            );
            anyhow::bail!(
                "Transaction reverted: {} - enableCRCForRouting({}, {} address(es)) failed on-chain",
                receipt.transaction_hash,
                origin,
                addresses.len()
            );
        }

        Ok(receipt.transaction_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn test_parse_signer_accepts_prefix() {
        let with_prefix = parse_signer(KEY).unwrap();
        let without_prefix = parse_signer(KEY.trim_start_matches("0x")).unwrap();
        assert_eq!(with_prefix.address(), without_prefix.address());
    }

    #[test]
    fn test_parse_signer_rejects_garbage() {
        assert!(parse_signer("not-a-key").is_err());
    }

    #[test]
    fn test_sink_targets_router() {
        let router = Address::repeat_byte(0x42);
        let signer = parse_signer(KEY).unwrap();
        let expected_sender = signer.address();

        let sink = RouterSink::new("http://localhost:8545", signer, router).unwrap();
        assert_eq!(sink.router(), router);
        assert_eq!(sink.sender(), expected_sender);
    }

    #[test]
    fn test_sink_rejects_bad_url() {
        let signer = parse_signer(KEY).unwrap();
        assert!(RouterSink::new("not a url", signer, Address::ZERO).is_err());
    }
}
