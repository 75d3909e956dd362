//! Scan deduplication gate

use std::time::Duration;

use tokio::time::Instant;

/// Default span during which an identical payload counts as the same scan
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_millis(5000);

/// The most recently accepted scan
#[derive(Debug, Clone)]
struct ScanRecord {
    payload: String,
    accepted_at: Instant,
}

/// Suppresses repeated decodes of one physical scan
///
/// A payload is accepted when it differs from the last accepted payload,
/// or when the last acceptance is older than the dedup window. State lives
/// only for the process lifetime.
#[derive(Debug)]
pub struct DedupGate {
    window: Duration,
    last: Option<ScanRecord>,
}

impl DedupGate {
    /// Create a gate with a custom window
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Decide whether a payload is a new scan
    ///
    /// Accepting updates the gate's record; rejecting leaves it untouched,
    /// so a code held in front of the sensor is suppressed until it has
    /// been out of acceptance for a full window.
    pub fn accept(&mut self, payload: &str) -> bool {
        let now = Instant::now();

        if let Some(last) = &self.last {
            if last.payload == payload && now.duration_since(last.accepted_at) < self.window {
                return false;
            }
        }

        self.last = Some(ScanRecord {
            payload: payload.to_string(),
            accepted_at: now,
        });
        true
    }
}

impl Default for DedupGate {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW)
    }
}
