//! Listener registry implementation

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Opaque, process-unique handle returned by [`ListenerRegistry::register`]
///
/// A handle is only meaningful for the topic it was minted for, and is never
/// reused while its registration is still live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

/// Topic-keyed registry of update callbacks
///
/// Thread-safe via `RwLock`. Dispatch snapshots the topic's callback list
/// before invoking, so registering or deregistering from inside a callback
/// (for the same or a different topic) never deadlocks.
pub struct ListenerRegistry {
    /// Map of topic to callbacks in registration order
    topics: RwLock<HashMap<String, Vec<(ListenerHandle, Listener)>>>,

    /// Source of process-unique handles
    next_handle: AtomicU64,
}

impl ListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Register a callback for a topic
    ///
    /// The callback runs every time an update for `topic` is dispatched,
    /// until [`deregister`](Self::deregister) is called with the returned
    /// handle.
    pub fn register<F>(&self, topic: &str, callback: F) -> ListenerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let handle = ListenerHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));

        let mut topics = self.topics.write().unwrap();
        topics
            .entry(topic.to_string())
            .or_default()
            .push((handle, Arc::new(callback)));

        tracing::debug!(topic = %topic, handle = handle.0, "Listener registered");
        handle
    }

    /// Deregister a callback
    ///
    /// A no-op if the handle was already removed or never belonged to this
    /// topic.
    pub fn deregister(&self, topic: &str, handle: ListenerHandle) {
        let mut topics = self.topics.write().unwrap();

        if let Some(entries) = topics.get_mut(topic) {
            let before = entries.len();
            entries.retain(|(h, _)| *h != handle);

            if entries.len() != before {
                tracing::debug!(topic = %topic, handle = handle.0, "Listener deregistered");
            }
            if entries.is_empty() {
                topics.remove(topic);
            }
        }
    }

    /// Dispatch an update to every listener of a topic
    ///
    /// Callbacks run synchronously in registration order. A panicking
    /// callback is logged and does not prevent the remaining callbacks from
    /// running.
    pub fn dispatch(&self, topic: &str) {
        // Snapshot under the read lock, invoke outside it.
        let snapshot: Vec<(ListenerHandle, Listener)> = {
            let topics = self.topics.read().unwrap();
            match topics.get(topic) {
                Some(entries) => entries.clone(),
                None => return,
            }
        };

        tracing::debug!(topic = %topic, listeners = snapshot.len(), "Dispatching update");

        for (handle, callback) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                tracing::error!(
                    topic = %topic,
                    handle = handle.0,
                    "Listener callback panicked"
                );
            }
        }
    }

    /// Number of listeners currently registered for a topic
    pub fn listener_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .unwrap()
            .get(topic)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
