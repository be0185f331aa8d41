//! # trustroute core
//!
//! Address canonicalization and the domain types shared by the reconciliation
//! engine and the service.
//!
//! - **Address**: Alloy's 20-byte `Address`, canonicalized from untrusted text
//! - **Verdicts**: blacklist classification with fail-open semantics
//! - **Targets**: origin-attributed enablement work units

#![warn(missing_docs)]

pub mod address;
pub mod error;
pub mod types;

pub use address::{canonical_string, canonicalize, canonicalize_all, checksummed, Canonicalized};
pub use error::{CoreError, Result};
pub use types::*;

// Re-export Alloy primitives for convenience
pub use alloy_primitives::{Address, TxHash, B256};
