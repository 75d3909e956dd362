//! Capture device and decode capability seams

use async_trait::async_trait;
use bytes::Bytes;

/// One captured frame, encoded however the device produces it
#[derive(Debug, Clone)]
pub struct Frame {
    /// Encoded image bytes (shared, cheap to clone)
    pub image: Bytes,
}

impl Frame {
    /// Wrap encoded image bytes in a frame
    pub fn new(image: impl Into<Bytes>) -> Self {
        Self {
            image: image.into(),
        }
    }
}

/// A device that can produce the current frame on demand
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Grab the current frame
    ///
    /// Returns `None` when the device is not ready (still warming up,
    /// permission pending, tab backgrounded). The capture loop skips the
    /// attempt and tries again next tick.
    async fn grab(&self) -> Option<Frame>;
}

/// A capability that extracts an embedded code payload from a frame
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    /// Decode a frame into a payload
    ///
    /// `None` means no decodable code in the frame, which is the common
    /// case and not an error.
    async fn decode(&self, frame: &Frame) -> Option<String>;
}
