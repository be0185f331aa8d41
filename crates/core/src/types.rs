//! Core types for trustroute.

use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Screening categories that mark an address as blacklisted.
pub const BLACKLISTED_CATEGORIES: [&str; 2] = ["blocked", "flagged"];

/// Verdict returned by the screening service for one address.
///
/// The address stays a raw string here: the service may return tokens in any
/// casing, and they are canonicalized by the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawVerdict {
    /// Address as returned by the service.
    pub address: String,
    /// Bot classification flag; `null` reads as `false`.
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_bot: bool,
    /// Optional category label (e.g. "blocked", "flagged", "human").
    #[serde(default)]
    pub category: Option<String>,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl RawVerdict {
    /// Interpret this raw response as a verdict.
    pub fn verdict(&self) -> Verdict {
        let listed = self
            .category
            .as_deref()
            .map(|c| BLACKLISTED_CATEGORIES.contains(&c))
            .unwrap_or(false);

        if self.is_bot || listed {
            Verdict::Blacklisted
        } else {
            Verdict::Allowed
        }
    }
}

/// Blacklist classification of an address.
///
/// Absence of a verdict is treated as [`Verdict::Allowed`] (fail-open).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Eligible for routing.
    #[default]
    Allowed,
    /// Excluded from routing.
    Blacklisted,
}

/// How an enablement target's origin was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginSource {
    /// The origin is a base group that trusts every address in the target.
    Grouped,
    /// The origin is the configured default group.
    Fallback,
}

impl OriginSource {
    /// Canonical lowercase string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OriginSource::Grouped => "grouped",
            OriginSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for OriginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addresses that must be enabled for routing under one origin group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnableTarget {
    /// Group under which the addresses are enabled.
    pub origin: Address,
    /// Addresses in discovery order, without duplicates.
    pub addresses: Vec<Address>,
    /// How the origin was attributed.
    pub source: OriginSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(is_bot: bool, category: Option<&str>) -> RawVerdict {
        RawVerdict {
            address: "0x0000000000000000000000000000000000000001".to_string(),
            is_bot,
            category: category.map(str::to_string),
        }
    }

    #[test]
    fn verdict_classification() {
        assert_eq!(raw(false, None).verdict(), Verdict::Allowed);
        assert_eq!(raw(false, Some("human")).verdict(), Verdict::Allowed);
        assert_eq!(raw(true, None).verdict(), Verdict::Blacklisted);
        assert_eq!(raw(false, Some("blocked")).verdict(), Verdict::Blacklisted);
        assert_eq!(raw(false, Some("flagged")).verdict(), Verdict::Blacklisted);
    }

    #[test]
    fn raw_verdict_deserializes_with_missing_fields() {
        let v: RawVerdict =
            serde_json::from_str(r#"{"address":"0xAbC0000000000000000000000000000000000001"}"#)
                .unwrap();
        assert!(!v.is_bot);
        assert!(v.category.is_none());
        assert_eq!(v.verdict(), Verdict::Allowed);
    }

    #[test]
    fn raw_verdict_null_flags_read_as_unset() {
        let v: RawVerdict = serde_json::from_str(
            r#"{"address":"0x0000000000000000000000000000000000000001","is_bot":null,"category":null}"#,
        )
        .unwrap();
        assert!(!v.is_bot);
        assert_eq!(v.verdict(), Verdict::Allowed);
    }

    #[test]
    fn origin_source_display() {
        assert_eq!(OriginSource::Grouped.to_string(), "grouped");
        assert_eq!(OriginSource::Fallback.to_string(), "fallback");
    }
}
