use std::time::Duration;
use tokio::time::sleep;

/// Fixed delays between project status polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub error_backoff: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            error_backoff: Duration::from_millis(5000),
        }
    }
}

impl PollSchedule {
    pub async fn wait_after_success(&self) {
        sleep(self.interval).await;
    }

    /// Fixed backoff; does not grow with repeated failures
    pub async fn wait_after_error(&self, consecutive_errors: u32) {
        tracing::info!(
            "Retrying status poll in {}ms (consecutive errors: {})",
            self.error_backoff.as_millis(),
            consecutive_errors
        );
        sleep(self.error_backoff).await;
    }
}

/// Bounds of the credit confirmation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditSchedule {
    pub interval: Duration,
    pub max_attempts: u32,
    /// Pause between showing the confirmation and navigating away
    pub redirect_delay: Duration,
}

impl Default for CreditSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_attempts: 10,
            redirect_delay: Duration::from_millis(2000),
        }
    }
}

impl CreditSchedule {
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let poll = PollSchedule::default();
        assert_eq!(poll.interval, Duration::from_secs(3));
        assert_eq!(poll.error_backoff, Duration::from_secs(5));

        let credits = CreditSchedule::default();
        assert!(!credits.is_exhausted(9));
        assert!(credits.is_exhausted(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_backoff_does_not_grow() {
        let schedule = PollSchedule::default();
        for errors in 1..=3 {
            let start = tokio::time::Instant::now();
            schedule.wait_after_error(errors).await;
            let elapsed = start.elapsed();
            assert!(elapsed >= Duration::from_secs(5));
            assert!(elapsed < Duration::from_millis(5100));
        }
    }
}
