//! Live synchronization and capture runtime for scan-driven game clients
//!
//! The backend owns all authoritative state (player status, scoreboard,
//! ticker text) and pushes change notifications over a long-lived update
//! stream. This crate keeps a client promptly synchronized with that state
//! and drives the scan-to-report pipeline:
//!
//! - [`registry`] — topic-based listener registry; UI code registers
//!   callbacks that re-fetch state when their topic changes
//! - [`stream`] — push-update stream manager with fixed-delay reconnect,
//!   a silence watchdog, and keepalive-counter desync detection
//! - [`capture`] — capture/decode loop over an injected sensor, with a
//!   dedup gate guaranteeing one report per physical scan
//! - [`client`] — HTTP client for report submission and artifact fetches
//! - [`cache`] — read-through, version-pruned local cache for artifact
//!   bodies
//!
//! # Wiring
//!
//! ```text
//!  server ──SSE──► StreamManager ──dispatch──► ListenerRegistry ──► UI callbacks
//!                                                                     │ re-fetch
//!  sensor ──frames──► CaptureLoop ──payload──► ScanSubmitter ──POST──►│ backend
//!                                                                     │
//!  ArtifactCache ◄──get(key)── UI        └──miss──► ApiClient ──GET──►┘
//! ```
//!
//! The rendering layer, the backend, the physical capture device, and the
//! code decoder are all external collaborators reached through traits
//! ([`capture::FrameSource`], [`capture::FrameDecoder`],
//! [`stream::StreamTransport`], [`cache::BlobStore`]).

pub mod cache;
pub mod capture;
pub mod client;
pub mod error;
pub mod registry;
pub mod stream;

pub use cache::{ArtifactCache, CacheConfig, MemoryStore};
pub use capture::{CaptureConfig, CaptureLoop, ScanEvent, ScanSubmitter};
pub use client::ApiClient;
pub use error::{Error, Result};
pub use registry::{ListenerHandle, ListenerRegistry};
pub use stream::{SseTransport, StreamConfig, StreamManager};
