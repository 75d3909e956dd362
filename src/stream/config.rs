//! Stream manager configuration

use std::time::Duration;

/// Stream connection manager options
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Delay before reconnecting after a transport error
    ///
    /// Fixed, not exponential: the stream carries low-volume control
    /// messages and a constant delay keeps worst-case staleness bounded.
    pub retry_delay: Duration,

    /// Maximum silence on an open stream before it is considered dead
    ///
    /// Must be greater than the server's keepalive interval, otherwise the
    /// watchdog restarts perfectly healthy streams.
    pub keepalive_timeout: Duration,

    /// How often the watchdog checks for silence
    pub watchdog_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(3),
            keepalive_timeout: Duration::from_secs(20),
            watchdog_interval: Duration::from_secs(1),
        }
    }
}

impl StreamConfig {
    /// Set the reconnect delay
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the keepalive timeout
    pub fn keepalive_timeout(mut self, timeout: Duration) -> Self {
        self.keepalive_timeout = timeout;
        self
    }

    /// Set the watchdog check interval
    pub fn watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();

        assert_eq!(config.retry_delay, Duration::from_secs(3));
        assert_eq!(config.keepalive_timeout, Duration::from_secs(20));
        assert_eq!(config.watchdog_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_builder_chaining() {
        let config = StreamConfig::default()
            .retry_delay(Duration::from_millis(500))
            .keepalive_timeout(Duration::from_secs(5))
            .watchdog_interval(Duration::from_millis(100));

        assert_eq!(config.retry_delay, Duration::from_millis(500));
        assert_eq!(config.keepalive_timeout, Duration::from_secs(5));
        assert_eq!(config.watchdog_interval, Duration::from_millis(100));
    }
}
