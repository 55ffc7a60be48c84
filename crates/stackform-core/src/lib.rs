//! # stackform-core
//!
//! Shared types for Stackform, a client that converges Formance stack
//! resources (ledgers, payments pools and connectors, webhooks, reconciliation
//! policies) to a declared state.
//!
//! This crate has no network code. It provides:
//!
//! - [`config`]: YAML configuration and credential resolution
//! - [`dynamic`]: schema-less attribute values and their JSON codec
//! - [`diagnostics`]: the result type every convergence operation returns
//! - [`reconcile`]: add/remove deltas between string sets
//! - [`query`]: query-builder validation for ledger and pool filters

pub mod config;
pub mod diagnostics;
pub mod dynamic;
pub mod query;
pub mod reconcile;

pub use config::{ConfigError, CredentialDefaults, CredentialSet, StackformConfig};
pub use diagnostics::{Diagnostic, DiagnosticCategory, Diagnostics, Severity, Transition};
pub use dynamic::{CodecError, DynamicKind, DynamicMap, DynamicValue};
pub use query::{QueryError, QueryExpr};
pub use reconcile::SetDelta;

/// Crate version, as reported by `stackform version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
