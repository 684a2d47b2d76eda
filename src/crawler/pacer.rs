//! Per-worker request pacing
//!
//! Each worker owns its own pacer and sleeps after every outbound fetch, so
//! the aggregate request rate against the upstream site is roughly
//! workers / delay. There is no cross-worker coordination: politeness is a
//! local property of each worker.

use std::time::Duration;

/// Self-contained politeness delay for one worker
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    delay: Duration,
}

impl Pacer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
        }
    }

    /// Observes the configured delay before the worker's next fetch
    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_pause_observes_delay() {
        let pacer = Pacer::new(30);
        let start = Instant::now();
        pacer.pause().await;
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_zero_delay_does_not_sleep() {
        let pacer = Pacer::new(0);
        let start = Instant::now();
        pacer.pause().await;
        assert!(start.elapsed() < Duration::from_millis(20));
    }
}
