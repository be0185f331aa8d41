//! Circles ledger access.
//!
//! This module provides:
//! - `circles_query` request/response types with cursor pagination
//! - The RPC-backed [`LedgerClient`](trustroute_engine::LedgerClient)

pub mod provider;
pub mod query;

pub use provider::CirclesRpc;
pub use query::{Cursor, Filter, QueryRequest, QueryResult, TableRef};
