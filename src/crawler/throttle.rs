//! Fixed-interval pacing between page loads

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pauses for a fixed interval after every processed URL
///
/// There is no burst allowance: the full interval is paid every time, failed
/// fetches included.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    interval: Duration,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Sleeps for the interval unless cancelled first
    ///
    /// Returns false if the pause was cut short by cancellation.
    pub async fn pause(&self, cancel: &CancellationToken) -> bool {
        if self.interval.is_zero() {
            tokio::task::yield_now().await;
            return !cancel.is_cancelled();
        }

        tokio::select! {
            _ = tokio::time::sleep(self.interval) => true,
            _ = cancel.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_pause_waits_full_interval() {
        let throttle = Throttle::new(Duration::from_millis(50));
        let start = Instant::now();

        assert!(throttle.pause(&CancellationToken::new()).await);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pause() {
        let throttle = Throttle::new(Duration::from_secs(60));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        assert!(!throttle.pause(&cancel).await);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_zero_interval() {
        let throttle = Throttle::new(Duration::ZERO);
        assert!(throttle.pause(&CancellationToken::new()).await);

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!throttle.pause(&cancel).await);
    }
}
