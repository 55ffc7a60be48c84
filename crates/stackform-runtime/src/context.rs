//! Cancellation and deadline carried through one transition.

use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use stackform_core::{Diagnostic, DiagnosticCategory};

/// Why an operation stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    #[error("operation cancelled")]
    Cancelled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

impl Interrupted {
    pub fn to_diagnostic(self) -> Diagnostic {
        let code = match self {
            Interrupted::Cancelled => "CANCELLED",
            Interrupted::DeadlineExceeded => "DEADLINE_EXCEEDED",
        };
        Diagnostic::error(DiagnosticCategory::Cancelled, code, self.to_string())
    }
}

/// Caller-controlled cancellation signal plus an optional deadline.
///
/// Cloning shares the signal: cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing token, for example one tied to Ctrl-C.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.cancel.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupted::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn interrupted(&self) -> Interrupted {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Interrupted::Cancelled,
                _ = sleep_until(deadline) => Interrupted::DeadlineExceeded,
            },
            None => {
                self.cancel.cancelled().await;
                Interrupted::Cancelled
            }
        }
    }

    /// Drive `fut` unless the context is interrupted first.
    ///
    /// On interruption `fut` is dropped, which aborts an in-flight request.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Interrupted> {
        self.check()?;
        tokio::select! {
            biased;
            reason = self.interrupted() => Err(reason),
            out = fut => Ok(out),
        }
    }
}
