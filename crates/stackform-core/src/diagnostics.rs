//! Diagnostics returned by convergence operations.
//!
//! Operations never fail with a bare error. They return the state they reached
//! together with a list of [`Diagnostic`]s describing what went wrong or what
//! the operator should know.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Broad classification of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCategory {
    /// Input failed local validation. No remote call was made.
    InvalidConfiguration,
    /// A module did not report healthy within the allowed time.
    HealthTimeout,
    /// The remote side reported an error.
    Remote,
    /// A multi-step update stopped midway.
    PartialUpdate,
    /// The operation was cancelled by the caller.
    Cancelled,
    /// The resource kind does not support the operation.
    Unsupported,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticCategory::InvalidConfiguration => "invalid_configuration",
            DiagnosticCategory::HealthTimeout => "health_timeout",
            DiagnosticCategory::Remote => "remote",
            DiagnosticCategory::PartialUpdate => "partial_update",
            DiagnosticCategory::Cancelled => "cancelled",
            DiagnosticCategory::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// A single user-facing message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: DiagnosticCategory,

    /// Stable machine-readable code (remote error code or local code).
    pub code: String,

    pub message: String,

    /// Attribute the diagnostic is about, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,

    /// Correlation identifier from the remote response, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl Diagnostic {
    pub fn error(category: DiagnosticCategory, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category,
            code: code.into(),
            message: message.into(),
            attribute: None,
            correlation_id: None,
        }
    }

    pub fn warning(category: DiagnosticCategory, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(category, code, message)
        }
    }

    /// Attach the attribute path this diagnostic refers to.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Attach a remote correlation identifier.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Shorthand for a local validation failure.
    pub fn invalid(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::error(DiagnosticCategory::InvalidConfiguration, "INVALID_CONFIGURATION", message)
            .with_attribute(attribute)
    }

    /// Shorthand for an operation the resource kind does not implement.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::warning(DiagnosticCategory::Unsupported, "UNSUPPORTED", message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{level}[{}]: {}", self.code, self.message)?;
        if let Some(attr) = &self.attribute {
            write!(f, " (at {attr})")?;
        }
        Ok(())
    }
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    /// True when at least one diagnostic has error severity.
    pub fn has_error(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self(diagnostics)
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Result of a state transition: the state reached plus diagnostics.
///
/// `state` is `None` when the resource should be removed from local state
/// (after a successful delete, or when a create never took effect).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<S> {
    pub state: Option<S>,
    pub diagnostics: Diagnostics,
}

impl<S> Transition<S> {
    pub fn ok(state: S) -> Self {
        Self {
            state: Some(state),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Keep `state` and report the given diagnostics.
    pub fn with(state: Option<S>, diagnostics: impl Into<Diagnostics>) -> Self {
        Self {
            state,
            diagnostics: diagnostics.into(),
        }
    }

    /// No state, only diagnostics.
    pub fn failed(diagnostics: impl Into<Diagnostics>) -> Self {
        Self {
            state: None,
            diagnostics: diagnostics.into(),
        }
    }

    pub fn removed() -> Self {
        Self {
            state: None,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }

    pub fn map<T>(self, f: impl FnOnce(S) -> T) -> Transition<T> {
        Transition {
            state: self.state.map(f),
            diagnostics: self.diagnostics,
        }
    }
}
