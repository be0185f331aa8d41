//! Address canonicalization.
//!
//! Every address coming from the ledger, the screening service or the
//! configuration passes through [`canonicalize`] before it is used as a set key.
//! Casing and the `0x` prefix are not significant; checksums are not enforced,
//! since indexers routinely return lowercase data.

use alloy_primitives::Address;

use crate::error::CoreError;

/// Parse an untrusted address token into its canonical 20-byte identity.
///
/// Accepts surrounding whitespace, an optional `0x`/`0X` prefix and hex digits of
/// any casing. Anything else is rejected with [`CoreError::InvalidAddress`].
pub fn canonicalize(raw: &str) -> Result<Address, CoreError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() != 40 {
        return Err(CoreError::InvalidAddress(raw.to_string()));
    }

    let bytes = hex::decode(digits).map_err(|_| CoreError::InvalidAddress(raw.to_string()))?;
    Ok(Address::from_slice(&bytes))
}

/// Lowercase `0x`-prefixed form used in logs, storage keys and RPC filters.
pub fn canonical_string(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

/// EIP-55 checksummed form.
pub fn checksummed(address: &Address) -> String {
    address.to_checksum(None)
}

/// Result of canonicalizing a batch of raw tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Canonicalized {
    /// Accepted addresses, in input order (duplicates preserved).
    pub accepted: Vec<Address>,
    /// Raw tokens that failed to parse.
    pub rejected: Vec<String>,
}

/// Canonicalize every token, collecting rejections instead of failing.
pub fn canonicalize_all<I, S>(raw: I) -> Canonicalized
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Canonicalized::default();
    for token in raw {
        let token = token.as_ref();
        match canonicalize(token) {
            Ok(address) => out.accepted.push(address),
            Err(_) => out.rejected.push(token.to_string()),
        }
    }
    out
}
