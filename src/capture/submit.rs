//! Report submission behind the dedup gate
//!
//! The submitter is the single consumer of decoded payloads. It asks the
//! [`DedupGate`] whether a payload is a new physical scan, forwards new
//! scans to the report-submission endpoint, and translates the response
//! status into user-facing events. Successful submissions need no further
//! handling here: state propagation happens over the update stream, not
//! through this path.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::client::ClientError;

use super::dedup::DedupGate;

/// Interpreted outcome of one report submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The server accepted the report
    Accepted,
    /// The server rejected the report; the user should be told
    Forbidden,
    /// The payload refers to nothing; treat as decode noise
    NotFound,
    /// Any other non-success status
    Other(u16),
}

/// Where accepted payloads are submitted
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Submit one report with the payload as opaque data
    async fn submit_report(&self, payload: &str) -> Result<SubmitOutcome, ClientError>;
}

/// Events for UI feedback (sound, flash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A report was submitted and accepted
    Accepted { payload: String },
    /// The server refused the report
    Rejected { payload: String },
}

/// Dedup gate plus submission driver
pub struct ScanSubmitter {
    sink: Arc<dyn ReportSink>,
    gate: Mutex<DedupGate>,
    events: mpsc::Sender<ScanEvent>,
}

impl ScanSubmitter {
    /// Create a submitter with a custom dedup window
    ///
    /// Returns the submitter and a receiver for feedback events.
    pub fn new(sink: Arc<dyn ReportSink>, window: Duration) -> (Self, mpsc::Receiver<ScanEvent>) {
        let (tx, rx) = mpsc::channel(64);

        let submitter = Self {
            sink,
            gate: Mutex::new(DedupGate::new(window)),
            events: tx,
        };

        (submitter, rx)
    }

    /// Consume one decoded payload
    ///
    /// Returns `true` when the payload passed the dedup gate and was
    /// forwarded to the submission endpoint, whatever the endpoint said.
    /// Submission failures are logged here and go no further; the capture
    /// loop has nothing useful to do with them.
    pub async fn accept(&self, payload: &str) -> bool {
        if !self.gate.lock().unwrap().accept(payload) {
            tracing::debug!(payload = %payload, "Duplicate scan suppressed");
            return false;
        }

        match self.sink.submit_report(payload).await {
            Ok(SubmitOutcome::Accepted) => {
                tracing::info!(payload = %payload, "Report accepted");
                let _ = self.events.try_send(ScanEvent::Accepted {
                    payload: payload.to_string(),
                });
            }
            Ok(SubmitOutcome::Forbidden) => {
                tracing::warn!(payload = %payload, "Report rejected by server");
                let _ = self.events.try_send(ScanEvent::Rejected {
                    payload: payload.to_string(),
                });
            }
            Ok(SubmitOutcome::NotFound) => {
                // A decode that matches nothing server-side; common when the
                // decoder misfires on visual noise.
                tracing::debug!(payload = %payload, "Report target unknown - discarding");
            }
            Ok(SubmitOutcome::Other(status)) => {
                tracing::warn!(payload = %payload, status = status, "Unexpected submission status");
            }
            Err(err) => {
                tracing::warn!(payload = %payload, error = %err, "Report submission failed");
            }
        }

        true
    }
}
