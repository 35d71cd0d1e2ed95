//! Timer helpers

use std::time::Duration;

/// Suspend the current task for `duration`
///
/// A zero duration still yields once to the scheduler.
pub async fn sleep(duration: Duration) {
    if duration.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(duration).await;
    }
}

/// Suspend the current task for `ms` milliseconds
pub async fn sleep_ms(ms: u64) {
    sleep(Duration::from_millis(ms)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_advances_clock() {
        let start = Instant::now();
        sleep(Duration::from_millis(250)).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(250));
        assert!(elapsed < Duration::from_millis(260));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_ms() {
        let start = Instant::now();
        sleep_ms(40).await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_zero_sleep_returns() {
        sleep(Duration::ZERO).await;
    }
}
