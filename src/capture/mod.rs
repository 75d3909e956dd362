//! Capture, decode, deduplicate, submit
//!
//! The capture loop drives a physical sensor on a fixed cadence: grab a
//! frame, ask the decode capability for an embedded code payload, and hand
//! any hit to the submission gate. The same code sits in front of the
//! camera for many consecutive frames, so the gate suppresses repeats
//! inside a dedup window and issues exactly one report per physical scan.
//!
//! # Pipeline
//!
//! ```text
//!   ┌─────────────┐  frame   ┌──────────────┐  payload  ┌───────────────┐
//!   │ FrameSource │─────────►│ FrameDecoder │──────────►│ ScanSubmitter │
//!   └─────────────┘          └──────────────┘           │  DedupGate    │
//!         ▲                                             │  ReportSink   │
//!         │ every `interval`, one attempt at a time     └──────┬────────┘
//!         └── CaptureLoop ◄────────────────────────────────────┘
//!                                              accepted / rejected events
//! ```
//!
//! The capture device and the decoder are external capabilities injected
//! through the [`FrameSource`] and [`FrameDecoder`] traits.

pub mod dedup;
pub mod scanner;
pub mod source;
pub mod submit;

pub use dedup::DedupGate;
pub use scanner::{CaptureConfig, CaptureLoop};
pub use source::{Frame, FrameDecoder, FrameSource};
pub use submit::{ReportSink, ScanEvent, ScanSubmitter, SubmitOutcome};
