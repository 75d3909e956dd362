//! Push-update stream connection manager
//!
//! Maintains one long-lived, server-initiated update stream per endpoint
//! and fans inbound update messages out through the
//! [`ListenerRegistry`](crate::registry::ListenerRegistry). The manager
//! self-heals: transport errors trigger a fixed-delay reconnect, and a
//! watchdog restarts the stream immediately when it has gone silent for
//! longer than the keepalive threshold.
//!
//! # Session lifecycle
//!
//! ```text
//!           start()
//!              │
//!              ▼
//!        ┌────────────┐  connected   ┌────────┐  message (timestamp refreshed)
//!        │ Connecting │─────────────►│  Open  │◄─────────┐
//!        └────────────┘              └───┬────┘──────────┘
//!              ▲                         │
//!              │ backoff elapsed         │ transport error / stream end
//!        ┌─────┴──────┐                  │
//!        │ RetryWait  │◄─────────────────┘
//!        └────────────┘
//!              ▲
//!              └── watchdog: silence > keepalive threshold, or keepalive
//!                  counter desync → reconnect immediately (no backoff)
//! ```
//!
//! Every (re)connect starts a new generation. Timers and completions tagged
//! with a superseded generation are discarded, never acted upon.

pub mod config;
pub mod manager;
pub mod message;
pub mod transport;

pub use config::StreamConfig;
pub use manager::{SessionPhase, StreamManager};
pub use message::{MessageKind, StreamMessage};
pub use transport::{SseTransport, StreamTransport, TransportError, TransportStream};
