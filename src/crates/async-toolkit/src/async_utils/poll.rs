//! Polling until a condition holds
//!
//! The deadline is only checked between attempts, so a slow attempt can
//! push the total time past `timeout` before the loop notices. The loop
//! never ends silently: it returns the accepted value, the polled
//! function's error, or [`PollError::Timeout`].

use super::timeout::TimeoutGuard;
use crate::config::{build_env_key, get_env_duration_ms, ConfigBuilder};
use crate::{Result, ToolkitError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Polling cadence and deadline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Pause between attempts
    pub interval: Duration,
    /// Give up once this much time has passed since the first attempt started
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            timeout: Duration::from_millis(30_000),
        }
    }
}

impl PollConfig {
    /// Create a polling configuration
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Set the pause between attempts
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the overall deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ConfigBuilder for PollConfig {
    fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(ToolkitError::Config(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn from_env(prefix: &str) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            interval: get_env_duration_ms(&build_env_key(prefix, "interval_ms"))?
                .unwrap_or(defaults.interval),
            timeout: get_env_duration_ms(&build_env_key(prefix, "timeout_ms"))?
                .unwrap_or(defaults.timeout),
        })
    }

    fn merge(&mut self, other: Self) -> &mut Self {
        let defaults = Self::default();
        if other.interval != defaults.interval {
            self.interval = other.interval;
        }
        if other.timeout != defaults.timeout {
            self.timeout = other.timeout;
        }
        self
    }
}

/// Why polling stopped without an accepted value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError<E> {
    /// The deadline passed before the predicate held
    #[error("Polling timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    /// The polled function itself failed
    #[error("{0}")]
    Failed(E),
}

impl<E> PollError<E> {
    /// Whether the loop gave up on time
    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::Timeout(_))
    }
}

/// Poll `operation` until `condition` accepts its value
///
/// # Example
///
/// ```rust,ignore
/// use async_toolkit::{poll_until, PollConfig};
/// use std::time::Duration;
///
/// let config = PollConfig::new(Duration::from_secs(2), Duration::from_secs(60));
/// let job = poll_until(|| export_status(job_id), |job| job.done, &config).await?;
/// ```
pub async fn poll_until<F, Fut, T, E, P>(
    operation: F,
    condition: P,
    config: &PollConfig,
) -> std::result::Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    P: FnMut(&T) -> bool,
{
    poll_until_notify(operation, condition, config, |_, _| {}).await
}

/// Like [`poll_until`], calling `on_poll(&value, attempt)` after every attempt
///
/// `attempt` is 1-based. The callback fires whether or not the value is
/// accepted.
pub async fn poll_until_notify<F, Fut, T, E, P, N>(
    mut operation: F,
    mut condition: P,
    config: &PollConfig,
    mut on_poll: N,
) -> std::result::Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    P: FnMut(&T) -> bool,
    N: FnMut(&T, usize),
{
    let guard = TimeoutGuard::new(config.timeout);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let value = operation().await.map_err(PollError::Failed)?;
        on_poll(&value, attempt);

        if condition(&value) {
            tracing::debug!("Poll condition met after {} attempts", attempt);
            return Ok(value);
        }

        // Only strictly past the timeout.
        if guard.is_expired() {
            tracing::debug!(
                "Polling gave up after {} attempts in {:?}",
                attempt,
                guard.elapsed()
            );
            return Err(PollError::Timeout(config.timeout));
        }

        tokio::time::sleep(config.interval).await;
    }
}
