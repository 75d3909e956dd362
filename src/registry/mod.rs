//! Listener registry for topic-based update routing
//!
//! UI-facing code registers a callback against a topic; the stream
//! connection manager dispatches inbound update messages by topic and every
//! callback registered for that topic runs once, in registration order.
//!
//! # Architecture
//!
//! ```text
//!                    Arc<ListenerRegistry>
//!              ┌────────────────────────────────┐
//!              │ topics: HashMap<Topic,         │
//!              │   Vec<(ListenerHandle, Fn)>    │
//!              │ >                              │
//!              └──────────────┬─────────────────┘
//!                             │ dispatch("ticker")
//!          ┌──────────────────┼──────────────────┐
//!          ▼                  ▼                  ▼
//!     [ticker cb 1]      [ticker cb 2]     ("user" cbs untouched)
//! ```
//!
//! The registry does no I/O of its own; callbacks typically re-fetch state
//! through ordinary request/response calls outside this crate.

pub mod store;

pub use store::{ListenerHandle, ListenerRegistry};
