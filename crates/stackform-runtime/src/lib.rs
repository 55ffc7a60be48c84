//! # stackform-runtime
//!
//! Convergence engines for Formance stack resources.
//!
//! A host drives one transition (create, read, update, delete) per resource
//! instance. Each transition validates locally, waits for the owning module
//! to report healthy, then issues remote calls one at a time. Failures come
//! back as diagnostics on the returned [`Transition`](stackform_core::Transition),
//! never as an `Err`.
//!
//! - [`bootstrap`]: configuration to shared client ([`ProviderHandle`])
//! - [`health`]: the module health gate
//! - [`translate`]: remote errors to diagnostics
//! - [`resource`] and [`resources`]: the engine contract and its six kinds
//! - [`connectors`]: provider-discriminated connector configurations
//! - [`tracer`] and [`registry`]: tracing wrapper and kind-erased dispatch

pub mod bootstrap;
pub mod connectors;
pub mod context;
pub mod health;
pub mod registry;
pub mod resource;
pub mod resources;
pub mod tracer;
pub mod translate;

pub use bootstrap::{BootstrapError, ProviderBootstrap, ProviderHandle};
pub use connectors::{ConnectorConfig, ConnectorProvider};
pub use context::{Interrupted, OperationContext};
pub use health::{GateError, ModuleHealthGate};
pub use registry::{DynResource, ResourceKind, UnknownKind, resource_for};
pub use resource::{ImportState, Plan, PlanAction, Resource, ValidateConfig};
pub use tracer::TracedResource;
pub use translate::ErrorTranslator;
