//! Retry utilities for async operations
//!
//! Repeats a failing work function with exponentially increasing delays up
//! to a ceiling. The schedule is deterministic unless jitter is switched on.

use crate::config::{build_env_key, get_env_bool, get_env_duration_ms, get_env_parse, ConfigBuilder};
use crate::{Result, ToolkitError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Configuration for retrying failed operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt (0 = single attempt)
    pub max_retries: usize,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry
    pub backoff_multiplier: f64,

    /// Scale each delay by a random factor in `[0.5, 1.5]`
    pub jitter: bool,
}

impl RetryPolicy {
    /// Create a new retry policy with the given number of retries
    ///
    /// # Example
    ///
    /// ```rust
    /// use async_toolkit::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(2);
    /// assert_eq!(policy.max_retries, 2);
    /// assert_eq!(policy.initial_delay, Duration::from_secs(1));
    /// ```
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    /// Set the delay before the first retry
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the backoff multiplier
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set the maximum delay between retries
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Total number of attempts, including the first
    pub fn max_attempts(&self) -> usize {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry `retry` (0-indexed from the first retry)
    ///
    /// `min(initial_delay * backoff_multiplier^retry, max_delay)`, then
    /// scaled by jitter if enabled and capped again.
    pub fn delay_for(&self, retry: usize) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());

        let delay = if self.jitter {
            let factor = rand::thread_rng().gen_range(0.5..=1.5);
            (capped * factor).min(self.max_delay.as_secs_f64())
        } else {
            capped
        };

        Duration::try_from_secs_f64(delay).unwrap_or(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ConfigBuilder for RetryPolicy {
    fn validate(&self) -> Result<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ToolkitError::Config(format!(
                "backoff_multiplier must be a finite value >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.initial_delay > self.max_delay {
            return Err(ToolkitError::Config(format!(
                "initial_delay ({:?}) exceeds max_delay ({:?})",
                self.initial_delay, self.max_delay
            )));
        }
        Ok(())
    }

    fn from_env(prefix: &str) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            max_retries: get_env_parse(&build_env_key(prefix, "max_retries"))?
                .unwrap_or(defaults.max_retries),
            initial_delay: get_env_duration_ms(&build_env_key(prefix, "initial_delay_ms"))?
                .unwrap_or(defaults.initial_delay),
            max_delay: get_env_duration_ms(&build_env_key(prefix, "max_delay_ms"))?
                .unwrap_or(defaults.max_delay),
            backoff_multiplier: get_env_parse(&build_env_key(prefix, "backoff_multiplier"))?
                .unwrap_or(defaults.backoff_multiplier),
            jitter: get_env_bool(&build_env_key(prefix, "jitter"))?.unwrap_or(defaults.jitter),
        })
    }

    fn merge(&mut self, other: Self) -> &mut Self {
        let defaults = Self::default();
        if other.max_retries != defaults.max_retries {
            self.max_retries = other.max_retries;
        }
        if other.initial_delay != defaults.initial_delay {
            self.initial_delay = other.initial_delay;
        }
        if other.max_delay != defaults.max_delay {
            self.max_delay = other.max_delay;
        }
        if other.backoff_multiplier != defaults.backoff_multiplier {
            self.backoff_multiplier = other.backoff_multiplier;
        }
        if other.jitter != defaults.jitter {
            self.jitter = other.jitter;
        }
        self
    }
}

/// Per-invocation retry bookkeeping
///
/// Created fresh by every [`with_retry`] call; never shared between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryState {
    /// Attempts made so far
    pub attempt: usize,

    /// Delay to wait before the next retry
    pub delay: Duration,
}

impl RetryState {
    /// Create the state for a fresh invocation of `policy`
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            delay: policy.delay_for(0),
        }
    }

    /// Record a failed attempt
    pub fn record_failure(&mut self) {
        self.attempt += 1;
    }

    /// Whether another attempt is allowed after `attempt` failures
    pub fn can_retry(&self, policy: &RetryPolicy) -> bool {
        self.attempt <= policy.max_retries
    }

    /// Move on to the delay for the next retry
    pub fn advance(&mut self, policy: &RetryPolicy) {
        self.delay = policy.delay_for(self.attempt);
    }
}

/// Execute an async operation with retry logic
///
/// Returns the first success, or the error from the **last** attempt once
/// `max_retries` retries have failed.
///
/// # Example
///
/// ```rust,ignore
/// use async_toolkit::{with_retry, RetryPolicy};
///
/// let policy = RetryPolicy::new(3);
/// let profile = with_retry(&policy, || fetch_profile(user_id)).await?;
/// ```
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, operation: F) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    with_retry_notify(policy, operation, |_, _| {}).await
}

/// Execute an async operation with retry logic, reporting each failure
///
/// `on_retry(&error, attempt)` is called with the 1-based number of the
/// attempt that just failed, right before the backoff sleep. It is not
/// called after the final failure and cannot influence the loop.
pub async fn with_retry_notify<F, Fut, T, E, N>(
    policy: &RetryPolicy,
    mut operation: F,
    mut on_retry: N,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    N: FnMut(&E, usize),
{
    let mut state = RetryState::new(policy);

    loop {
        let error = match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => error,
        };
        state.record_failure();

        if !state.can_retry(policy) {
            tracing::debug!(
                "Attempt {} failed. Giving up after {} retries",
                state.attempt,
                policy.max_retries
            );
            return Err(error);
        }

        tracing::debug!(
            "Attempt {} failed. Retrying in {:?}",
            state.attempt,
            state.delay
        );
        on_retry(&error, state.attempt);

        tokio::time::sleep(state.delay).await;
        state.advance(policy);
    }
}
