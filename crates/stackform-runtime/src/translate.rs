//! Translation of remote failures into diagnostics.

use serde::Deserialize;
use stackform_client::{ApiError, RemoteError, ResponseContext};
use stackform_core::{Diagnostic, DiagnosticCategory};

/// Code used when the failure matches no known envelope.
pub const FALLBACK_CODE: &str = "INTERNAL";

/// Maps every [`RemoteError`] shape to one `(code, message, correlation id)`
/// diagnostic. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorTranslator;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BodyEnvelope {
    error_code: String,
    #[serde(default)]
    error_message: String,
}

impl ErrorTranslator {
    pub fn translate(error: &ApiError) -> Diagnostic {
        Self::translate_parts(&error.error, &error.response)
    }

    pub fn translate_parts(error: &RemoteError, response: &ResponseContext) -> Diagnostic {
        let (code, message) = Self::code_and_message(error);

        let mut diagnostic = match &response.traceparent {
            Some(traceparent) => Diagnostic::error(
                DiagnosticCategory::Remote,
                code,
                format!("[Traceparent: {traceparent}] {message}"),
            )
            .with_correlation_id(traceparent.clone()),
            None => Diagnostic::error(DiagnosticCategory::Remote, code, message),
        };
        if diagnostic.message.is_empty() {
            diagnostic.message = "unexpected error".to_string();
        }
        diagnostic
    }

    fn code_and_message(error: &RemoteError) -> (String, String) {
        match error {
            RemoteError::V2ErrorResponse {
                error_code,
                error_message,
                details,
            }
            | RemoteError::V3ErrorResponse {
                error_code,
                error_message,
                details,
            }
            | RemoteError::ErrorResponse {
                error_code,
                error_message,
                details,
            } => {
                let message = match details {
                    Some(details) if !details.is_empty() => {
                        format!("{error_message} (details: {details})")
                    }
                    _ => error_message.clone(),
                };
                (error_code.clone(), message)
            }
            RemoteError::Unexpected { status, body } => {
                match serde_json::from_str::<BodyEnvelope>(body) {
                    Ok(envelope) => (envelope.error_code, envelope.error_message),
                    Err(_) if body.trim().is_empty() => {
                        (FALLBACK_CODE.to_string(), format!("unexpected status {status}"))
                    }
                    Err(_) => (FALLBACK_CODE.to_string(), body.clone()),
                }
            }
            RemoteError::Decode(message) | RemoteError::Transport(message) => {
                (FALLBACK_CODE.to_string(), message.clone())
            }
        }
    }
}
