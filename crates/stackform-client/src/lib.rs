//! # stackform-client
//!
//! Typed client for the Formance stack API.
//!
//! The API surface is a set of async traits ([`StackApi`] and one trait per
//! module) so the convergence engines can run against an in-memory fake. The
//! production implementation is [`HttpStackClient`], whose outbound requests
//! pass through the [`transport`] decorators chosen at construction time.

pub mod api;
pub mod error;
pub mod http;
pub mod models;
pub mod transport;

pub use api::{LedgerApi, PaymentsApi, ReconciliationApi, StackApi, WebhooksApi};
pub use error::{ApiError, ApiResult, ErrorFlavor, RemoteError, ResponseContext};
pub use http::{HttpStackClient, HttpStackClientBuilder};
pub use transport::{BearerAuth, RequestDecorator, StaticTokenSource, TokenSource, TraceparentStamper};
