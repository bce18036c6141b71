//! Failure diagnostics
//!
//! When a call fails, the client can hand a [`RequestFailure`] to a
//! [`FailureSink`] so the caller can inspect the exact bytes exchanged.
//! Recording is best-effort: a sink must never block or fail the call.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Diagnostic record of one failed request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFailure {
    /// Remote address the request went to, if it could be determined
    pub ip: Option<String>,

    /// Human-readable description of the failure
    pub message: String,

    /// Raw request as sent (request line, headers)
    pub request: Vec<u8>,

    /// Raw response as received (status line, headers, body), empty when
    /// no response arrived
    pub response: Vec<u8>,
}

/// Receiver of failure records
pub trait FailureSink: Send + Sync {
    /// Record a failure. Must return promptly.
    fn record(&self, failure: RequestFailure);
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl FailureSink for NoopSink {
    fn record(&self, _failure: RequestFailure) {}
}

impl FailureSink for mpsc::Sender<RequestFailure> {
    fn record(&self, failure: RequestFailure) {
        match self.try_send(failure) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::debug!("Failure channel full, dropping diagnostic record");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Failure channel closed, dropping diagnostic record");
            }
        }
    }
}

impl FailureSink for mpsc::UnboundedSender<RequestFailure> {
    fn record(&self, failure: RequestFailure) {
        if self.send(failure).is_err() {
            tracing::debug!("Failure channel closed, dropping diagnostic record");
        }
    }
}
