//! Blacklist screening client.
//!
//! Posts `{"addresses": [...]}` to `{base_url}/bot-analytics/classify` and reads
//! back `{"verdicts": [{"address", "is_bot", "category"}]}`. Transport and HTTP
//! errors propagate. Verdict items that do not parse are skipped, and
//! addresses missing from the response are the engine's concern.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use trustroute_core::{canonical_string, Address, RawVerdict};
use trustroute_engine::BlacklistClassifier;

const CLASSIFY_PATH: &str = "bot-analytics/classify";

#[derive(Debug, Serialize)]
struct ClassifyRequest {
    addresses: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    verdicts: Vec<serde_json::Value>,
}

/// HTTP screening client.
#[derive(Debug, Clone)]
pub struct ScreeningClient {
    client: Client,
    endpoint: String,
}

impl ScreeningClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build screening HTTP client")?;

        Ok(Self {
            client,
            endpoint: classify_url(base_url),
        })
    }

    /// Full classification URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn classify_url(base_url: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), CLASSIFY_PATH)
}

fn request_body(addresses: &[Address]) -> ClassifyRequest {
    ClassifyRequest {
        addresses: addresses.iter().map(canonical_string).collect(),
    }
}

fn parse_response(bytes: &[u8]) -> Result<Vec<RawVerdict>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let response: ClassifyResponse =
        serde_json::from_slice(bytes).context("Malformed screening response")?;

    let mut verdicts = Vec::with_capacity(response.verdicts.len());
    for item in response.verdicts {
        match serde_json::from_value::<RawVerdict>(item) {
            Ok(verdict) => verdicts.push(verdict),
            Err(e) => warn!("Skipping malformed screening verdict: {}", e),
        }
    }
    Ok(verdicts)
}

#[async_trait]
impl BlacklistClassifier for ScreeningClient {
    async fn classify(&self, addresses: &[Address]) -> Result<Vec<RawVerdict>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request_body(addresses))
            .send()
            .await
            .with_context(|| format!("Screening request to {} failed", self.endpoint))?
            .error_for_status()
            .context("Screening service returned an error status")?;

        let bytes = response
            .bytes()
            .await
            .context("Failed to read screening response")?;

        parse_response(&bytes)
    }
}
