//! Self-rescheduling capture loop

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

use super::source::{FrameDecoder, FrameSource};
use super::submit::ScanSubmitter;

/// Capture loop options
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Delay between the end of one attempt and the start of the next
    pub interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

impl CaptureConfig {
    /// Set the attempt interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Periodic grab-decode-forward task
///
/// One attempt runs at a time: the next attempt is scheduled only after the
/// current one settles, so a slow decode or submission can never overlap
/// with the next grab. The loop reschedules itself regardless of outcome
/// until [`stop`](Self::stop) (or drop) aborts it.
pub struct CaptureLoop {
    task: Option<JoinHandle<()>>,
}

impl CaptureLoop {
    /// Spawn the loop
    ///
    /// The first attempt starts immediately.
    pub fn spawn(
        source: Arc<dyn FrameSource>,
        decoder: Arc<dyn FrameDecoder>,
        submitter: Arc<ScanSubmitter>,
        config: CaptureConfig,
    ) -> Self {
        let task = tokio::spawn(async move {
            loop {
                attempt(source.as_ref(), decoder.as_ref(), &submitter).await;
                sleep(config.interval).await;
            }
        });

        Self { task: Some(task) }
    }

    /// Stop the loop
    ///
    /// Aborts the task and with it any pending reschedule timer. Safe to
    /// call repeatedly, and safe even if the device never produced a frame.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Capture loop stopped");
        }
    }

    /// Whether the loop has not been stopped yet
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One capture attempt
async fn attempt(source: &dyn FrameSource, decoder: &dyn FrameDecoder, submitter: &ScanSubmitter) {
    let Some(frame) = source.grab().await else {
        // Device not ready; skip this attempt, the loop reschedules anyway.
        tracing::trace!("Capture device not ready");
        return;
    };

    // No decodable code in the frame is the common case, not an error.
    let Some(payload) = decoder.decode(&frame).await else {
        return;
    };

    tracing::debug!(payload = %payload, "Decoded code payload");
    submitter.accept(&payload).await;
}
