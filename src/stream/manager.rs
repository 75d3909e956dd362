//! Stream connection manager implementation
//!
//! One manager owns one logical session against one endpoint. The session
//! runs as a single spawned task that connects, reads frames, and
//! reconnects forever; [`StreamManager::stop`] aborts the task and retires
//! its generation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Instant};

use crate::registry::ListenerRegistry;

use super::config::StreamConfig;
use super::message::{MessageKind, StreamMessage};
use super::transport::{StreamTransport, TransportStream};

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No session running
    Idle,
    /// Opening a new connection
    Connecting,
    /// Connection established, reading frames
    Open,
    /// Waiting out the backoff delay after a transport error
    RetryWait,
}

/// What a finished connection asks the session loop to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionOutcome {
    /// Reconnect immediately (liveness takes priority over backoff)
    Restart,
    /// Wait out the retry delay, then reconnect
    Failed,
}

/// What to do after handling one inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameAction {
    Continue,
    Restart,
}

struct SessionShared {
    config: StreamConfig,
    transport: Arc<dyn StreamTransport>,
    registry: Arc<ListenerRegistry>,
    endpoint: String,

    /// Incremented on every (re)connect; completions tagged with an older
    /// value are stale and must not be acted upon.
    generation: AtomicU64,

    phase: Mutex<SessionPhase>,
    last_message: Mutex<Instant>,
}

impl SessionShared {
    fn set_phase(&self, phase: SessionPhase) {
        *self.phase.lock().unwrap() = phase;
    }

    fn touch(&self) {
        *self.last_message.lock().unwrap() = Instant::now();
    }

    fn silence(&self) -> std::time::Duration {
        self.last_message.lock().unwrap().elapsed()
    }
}

/// Push-update stream manager
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use livescan::registry::ListenerRegistry;
/// use livescan::stream::{SseTransport, StreamConfig, StreamManager};
///
/// # fn example() -> Result<(), livescan::stream::TransportError> {
/// let registry = Arc::new(ListenerRegistry::new());
/// let transport = Arc::new(SseTransport::new("https://game.example/api/")?);
///
/// let manager = StreamManager::new(
///     transport,
///     Arc::clone(&registry),
///     "sse_updates",
///     StreamConfig::default(),
/// );
///
/// let handle = registry.register("ticker", || println!("ticker changed"));
/// manager.start();
/// // ... later ...
/// manager.stop();
/// registry.deregister("ticker", handle);
/// # Ok(())
/// # }
/// ```
pub struct StreamManager {
    shared: Arc<SessionShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamManager {
    /// Create a manager for one endpoint
    ///
    /// No connection is opened until [`start`](Self::start) is called.
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        registry: Arc<ListenerRegistry>,
        endpoint: impl Into<String>,
        config: StreamConfig,
    ) -> Self {
        Self {
            shared: Arc::new(SessionShared {
                config,
                transport,
                registry,
                endpoint: endpoint.into(),
                generation: AtomicU64::new(0),
                phase: Mutex::new(SessionPhase::Idle),
                last_message: Mutex::new(Instant::now()),
            }),
            task: Mutex::new(None),
        }
    }

    /// Start (or restart) the session
    ///
    /// An already-running session is torn down first; its pending timers die
    /// with its task and its generation is retired.
    pub fn start(&self) {
        let mut task = self.task.lock().unwrap();

        if let Some(old) = task.take() {
            old.abort();
        }

        let shared = Arc::clone(&self.shared);
        *task = Some(tokio::spawn(async move {
            session_loop(shared).await;
        }));
    }

    /// Stop the session
    ///
    /// Aborts the session task, cancels every timer it owned, and retires
    /// the current generation so in-flight completions become inert. Safe
    /// to call repeatedly and before the first [`start`](Self::start).
    pub fn stop(&self) {
        let mut task = self.task.lock().unwrap();

        if let Some(old) = task.take() {
            old.abort();
            tracing::debug!(endpoint = %self.shared.endpoint, "Update stream stopped");
        }

        // Retire the generation even if the task already finished, so any
        // completion still holding an old tag is discarded.
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.set_phase(SessionPhase::Idle);
    }

    /// Current session generation
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Current session phase
    pub fn phase(&self) -> SessionPhase {
        *self.shared.phase.lock().unwrap()
    }
}

impl Drop for StreamManager {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
        }
    }
}

/// Connect-read-reconnect loop; runs until the owning task is aborted
async fn session_loop(shared: Arc<SessionShared>) {
    loop {
        let generation = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        shared.set_phase(SessionPhase::Connecting);

        tracing::info!(
            endpoint = %shared.endpoint,
            generation = generation,
            "Opening update stream"
        );

        let outcome = run_connection(&shared, generation).await;

        match outcome {
            ConnectionOutcome::Restart => {
                // Liveness failure: reconnect immediately, bypassing backoff.
                continue;
            }
            ConnectionOutcome::Failed => {
                shared.set_phase(SessionPhase::RetryWait);
                sleep(shared.config.retry_delay).await;

                if shared.generation.load(Ordering::SeqCst) != generation {
                    tracing::debug!(
                        generation = generation,
                        "Stale retry for superseded generation - discarding"
                    );
                    return;
                }
            }
        }
    }
}

/// Drive one connection until it dies; returns how to reconnect
async fn run_connection(shared: &SessionShared, generation: u64) -> ConnectionOutcome {
    let mut stream: TransportStream = match shared.transport.connect(&shared.endpoint).await {
        Ok(stream) => stream,
        Err(err) => {
            tracing::warn!(
                endpoint = %shared.endpoint,
                generation = generation,
                error = %err,
                "Failed to open update stream"
            );
            return ConnectionOutcome::Failed;
        }
    };

    shared.touch();
    shared.set_phase(SessionPhase::Open);

    let mut keepalive_count: Option<u64> = None;
    let mut watchdog = interval(shared.config.watchdog_interval);
    // The first tick completes immediately; consume it so the loop only
    // wakes on real intervals.
    watchdog.tick().await;

    loop {
        tokio::select! {
            _ = watchdog.tick() => {
                let silence = shared.silence();
                if silence > shared.config.keepalive_timeout {
                    tracing::warn!(
                        generation = generation,
                        silence_ms = silence.as_millis() as u64,
                        "Keepalive timeout - restarting update stream"
                    );
                    return ConnectionOutcome::Restart;
                }
            }

            frame = stream.next() => match frame {
                Some(Ok(raw)) => {
                    shared.touch();
                    if handle_frame(shared, generation, &raw, &mut keepalive_count)
                        == FrameAction::Restart
                    {
                        return ConnectionOutcome::Restart;
                    }
                }
                Some(Err(err)) => {
                    tracing::warn!(
                        generation = generation,
                        error = %err,
                        "Update stream error - will retry"
                    );
                    return ConnectionOutcome::Failed;
                }
                None => {
                    tracing::warn!(generation = generation, "Update stream ended - will retry");
                    return ConnectionOutcome::Failed;
                }
            }
        }
    }
}

/// Parse and act on one raw frame
fn handle_frame(
    shared: &SessionShared,
    generation: u64,
    raw: &str,
    keepalive_count: &mut Option<u64>,
) -> FrameAction {
    let message = match StreamMessage::parse(raw) {
        Ok(message) => message,
        Err(err) => {
            tracing::warn!(
                generation = generation,
                error = %err,
                "Dropping malformed stream message"
            );
            return FrameAction::Continue;
        }
    };

    match message.classify() {
        MessageKind::Update { topic } => {
            shared.registry.dispatch(&topic);
            FrameAction::Continue
        }
        MessageKind::Keepalive { count } => match *keepalive_count {
            None => {
                *keepalive_count = Some(count);
                FrameAction::Continue
            }
            Some(previous) if count == previous + 1 => {
                *keepalive_count = Some(count);
                FrameAction::Continue
            }
            Some(previous) => {
                // A gap means the stream dropped messages we will never see.
                tracing::warn!(
                    generation = generation,
                    expected = previous + 1,
                    received = count,
                    "Keepalive desync - restarting update stream"
                );
                FrameAction::Restart
            }
        },
        MessageKind::Ignored => {
            tracing::debug!(
                generation = generation,
                handler = %message.handler,
                "Ignoring unrecognized stream message"
            );
            FrameAction::Continue
        }
        MessageKind::Malformed => {
            tracing::warn!(
                generation = generation,
                handler = %message.handler,
                "Dropping stream message with malformed payload"
            );
            FrameAction::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use crate::stream::transport::TransportError;

    use super::*;

    type FrameSender = mpsc::UnboundedSender<Result<String, TransportError>>;

    /// Transport that hands out pre-scripted connections in order
    struct ScriptedTransport {
        connections: Mutex<VecDeque<TransportStream>>,
        connects: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new() -> Self {
            Self {
                connections: Mutex::new(VecDeque::new()),
                connects: AtomicUsize::new(0),
            }
        }

        /// Queue a connection; returns the sender that feeds it
        fn push_connection(&self) -> FrameSender {
            let (tx, rx) = mpsc::unbounded_channel();
            let stream = futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|frame| (frame, rx))
            });
            self.connections
                .lock()
                .unwrap()
                .push_back(Box::pin(stream));
            tx
        }

        fn connect_count(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StreamTransport for ScriptedTransport {
        async fn connect(&self, _endpoint: &str) -> Result<TransportStream, TransportError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.connections
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| TransportError::Connect("no scripted connection".into()))
        }
    }

    fn update_frame(topic: &str) -> Result<String, TransportError> {
        Ok(format!(r#"{{"handler": "update_prompt", "data": "{topic}"}}"#))
    }

    fn keepalive_frame(count: u64) -> Result<String, TransportError> {
        Ok(format!(r#"{{"handler": "keepalive", "data": {count}}}"#))
    }

    fn counting_registry(topic: &str) -> (Arc<ListenerRegistry>, Arc<AtomicUsize>) {
        let registry = Arc::new(ListenerRegistry::new());
        let count = Arc::new(AtomicUsize::new(0));
        let cb_count = Arc::clone(&count);
        registry.register(topic, move || {
            cb_count.fetch_add(1, Ordering::SeqCst);
        });
        (registry, count)
    }

    fn manager_with(
        transport: Arc<ScriptedTransport>,
        registry: Arc<ListenerRegistry>,
    ) -> StreamManager {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
        StreamManager::new(transport, registry, "sse_updates", StreamConfig::default())
    }

    /// Let spawned tasks run for a slice of (paused) time
    async fn settle() {
        sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_messages_dispatch_by_topic() {
        let transport = Arc::new(ScriptedTransport::new());
        let tx = transport.push_connection();
        let (registry, ticker_count) = counting_registry("ticker");

        let manager = manager_with(Arc::clone(&transport), registry);
        manager.start();
        settle().await;

        tx.send(update_frame("ticker")).unwrap();
        settle().await;
        assert_eq!(ticker_count.load(Ordering::SeqCst), 1);

        // An update for a different topic leaves the ticker listener alone
        tx.send(update_frame("user")).unwrap();
        settle().await;
        assert_eq!(ticker_count.load(Ordering::SeqCst), 1);

        manager.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_message_is_dropped_not_fatal() {
        let transport = Arc::new(ScriptedTransport::new());
        let tx = transport.push_connection();
        let (registry, ticker_count) = counting_registry("ticker");

        let manager = manager_with(Arc::clone(&transport), registry);
        manager.start();
        settle().await;

        tx.send(Ok("{not json".to_string())).unwrap();
        settle().await;
        assert_eq!(ticker_count.load(Ordering::SeqCst), 0);

        // The session survived and still dispatches
        tx.send(update_frame("ticker")).unwrap();
        settle().await;
        assert_eq!(ticker_count.load(Ordering::SeqCst), 1);
        assert_eq!(transport.connect_count(), 1);

        manager.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_timeout_starts_new_generation() {
        let transport = Arc::new(ScriptedTransport::new());
        let _tx = transport.push_connection();
        let _tx2 = transport.push_connection();
        let (registry, _count) = counting_registry("ticker");

        let manager = manager_with(Arc::clone(&transport), registry);
        manager.start();
        settle().await;

        assert_eq!(transport.connect_count(), 1);
        let first_generation = manager.generation();

        // Silence past the 20s threshold: the next 1s watchdog tick
        // reconnects without waiting out any backoff.
        sleep(Duration::from_millis(22_000)).await;

        assert_eq!(transport.connect_count(), 2);
        assert!(manager.generation() > first_generation);

        manager.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_messages_on_discarded_generation_never_dispatch() {
        let transport = Arc::new(ScriptedTransport::new());
        let old_tx = transport.push_connection();
        let _new_tx = transport.push_connection();
        let (registry, ticker_count) = counting_registry("ticker");

        let manager = manager_with(Arc::clone(&transport), registry);
        manager.start();
        settle().await;

        // Force a restart via keepalive timeout, retiring the first stream
        sleep(Duration::from_millis(22_000)).await;
        assert_eq!(transport.connect_count(), 2);

        // A late message on the retired connection goes nowhere
        let _ = old_tx.send(update_frame("ticker"));
        settle().await;
        assert_eq!(ticker_count.load(Ordering::SeqCst), 0);

        manager.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_desync_restarts_stream() {
        let transport = Arc::new(ScriptedTransport::new());
        let tx = transport.push_connection();
        let _tx2 = transport.push_connection();
        let (registry, _count) = counting_registry("ticker");

        let manager = manager_with(Arc::clone(&transport), registry);
        manager.start();
        settle().await;

        // Consecutive counts keep the stream open
        tx.send(keepalive_frame(1)).unwrap();
        tx.send(keepalive_frame(2)).unwrap();
        settle().await;
        assert_eq!(transport.connect_count(), 1);

        // A gap means missed messages: restart immediately
        tx.send(keepalive_frame(4)).unwrap();
        settle().await;
        assert_eq!(transport.connect_count(), 2);

        manager.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_retries_after_fixed_delay() {
        let transport = Arc::new(ScriptedTransport::new());
        let tx = transport.push_connection();
        let _tx2 = transport.push_connection();
        let (registry, _count) = counting_registry("ticker");

        let manager = manager_with(Arc::clone(&transport), registry);
        manager.start();
        settle().await;

        tx.send(Err(TransportError::Stream("connection reset".into())))
            .unwrap();
        settle().await;

        // Inside the backoff window: no reconnect yet
        assert_eq!(transport.connect_count(), 1);
        assert_eq!(manager.phase(), SessionPhase::RetryWait);

        // Past the 3s fixed delay: reconnected
        sleep(Duration::from_millis(3_100)).await;
        assert_eq!(transport.connect_count(), 2);
        assert_eq!(manager.phase(), SessionPhase::Open);

        manager.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_end_is_retried() {
        let transport = Arc::new(ScriptedTransport::new());
        let tx = transport.push_connection();
        let _tx2 = transport.push_connection();
        let (registry, _count) = counting_registry("ticker");

        let manager = manager_with(Arc::clone(&transport), registry);
        manager.start();
        settle().await;

        // Server closed the stream cleanly
        drop(tx);
        sleep(Duration::from_millis(3_100)).await;

        assert_eq!(transport.connect_count(), 2);

        manager.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent_and_safe_before_start() {
        let transport = Arc::new(ScriptedTransport::new());
        let (registry, _count) = counting_registry("ticker");
        let manager = manager_with(Arc::clone(&transport), registry);

        // Never started
        manager.stop();
        assert_eq!(manager.phase(), SessionPhase::Idle);

        let _tx = transport.push_connection();
        manager.start();
        settle().await;
        assert_eq!(manager.phase(), SessionPhase::Open);

        manager.stop();
        manager.stop();
        assert_eq!(manager.phase(), SessionPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_supersedes_previous_session() {
        let transport = Arc::new(ScriptedTransport::new());
        let _tx = transport.push_connection();
        let _tx2 = transport.push_connection();
        let (registry, _count) = counting_registry("ticker");

        let manager = manager_with(Arc::clone(&transport), registry);
        manager.start();
        settle().await;
        let first_generation = manager.generation();

        manager.start();
        settle().await;

        assert_eq!(transport.connect_count(), 2);
        assert!(manager.generation() > first_generation);

        manager.stop();
    }
}
