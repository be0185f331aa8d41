//! trustroute service library.
//!
//! Wires the reconciliation engine to its production collaborators:
//! - [`ledger::CirclesRpc`]: Circles RPC (`circles_query` + hub `isHuman`)
//! - [`screening::ScreeningClient`]: HTTP blacklist screening
//! - [`sink::RouterSink`]: router `enableCRCForRouting` transactions
//! - [`storage::Storage`]: SQLite idempotency ledger
//!
//! and drives it periodically through [`service::ReconcileService`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod ledger;
pub mod screening;
pub mod service;
pub mod sink;
pub mod storage;

pub use config::Config;
pub use service::{ReconcileService, ServiceParts};
