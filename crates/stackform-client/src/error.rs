//! Error types for the stack API client.
//!
//! Each module of the stack answers failures with its own envelope. The client
//! keeps the envelope it received as a [`RemoteError`] variant so callers can
//! tell them apart, and pairs it with the [`ResponseContext`] of the request.

use serde::Deserialize;

/// Result type for stack API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// A failed stack API call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{error}")]
pub struct ApiError {
    pub error: RemoteError,
    pub response: ResponseContext,
}

impl ApiError {
    pub fn new(error: RemoteError, response: ResponseContext) -> Self {
        Self { error, response }
    }

    /// Error with no response attached.
    pub fn detached(error: RemoteError) -> Self {
        Self {
            error,
            response: ResponseContext::default(),
        }
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        self.response.status
    }
}

/// What is known about the request/response pair that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseContext {
    pub status: Option<u16>,

    /// W3C trace context header sent with (or echoed by) the request.
    pub traceparent: Option<String>,
}

/// Error envelope returned by the remote side.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    /// Ledger v2 error envelope.
    #[error("{error_code}: {error_message}")]
    V2ErrorResponse {
        error_code: String,
        error_message: String,
        details: Option<String>,
    },

    /// Payments v3 error envelope.
    #[error("{error_code}: {error_message}")]
    V3ErrorResponse {
        error_code: String,
        error_message: String,
        details: Option<String>,
    },

    /// Error envelope of the webhooks and reconciliation modules.
    #[error("{error_code}: {error_message}")]
    ErrorResponse {
        error_code: String,
        error_message: String,
        details: Option<String>,
    },

    /// Non-success response whose body matched no known envelope.
    #[error("unexpected status {status}: {body}")]
    Unexpected { status: u16, body: String },

    /// Successful response whose body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Which envelope a module answers errors with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFlavor {
    LedgerV2,
    PaymentsV3,
    V1,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    error_code: String,
    #[serde(default)]
    error_message: String,
    #[serde(default)]
    details: Option<String>,
}

impl RemoteError {
    /// Decode a non-success response body.
    ///
    /// Bodies that are not a JSON error envelope become
    /// [`RemoteError::Unexpected`] with the raw body kept.
    pub fn from_body(flavor: ErrorFlavor, status: u16, body: &str) -> Self {
        let Ok(envelope) = serde_json::from_str::<Envelope>(body) else {
            return RemoteError::Unexpected {
                status,
                body: body.to_string(),
            };
        };

        let Envelope {
            error_code,
            error_message,
            details,
        } = envelope;
        match flavor {
            ErrorFlavor::LedgerV2 => RemoteError::V2ErrorResponse {
                error_code,
                error_message,
                details,
            },
            ErrorFlavor::PaymentsV3 => RemoteError::V3ErrorResponse {
                error_code,
                error_message,
                details,
            },
            ErrorFlavor::V1 => RemoteError::ErrorResponse {
                error_code,
                error_message,
                details,
            },
        }
    }
}
