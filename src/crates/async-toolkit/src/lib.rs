//! Concurrency-control primitives for async operations
//!
//! This crate provides a flat set of combinators for talking to slow,
//! unreliable or rate-limited operations (network calls, database writes,
//! uploads) without blocking the caller or overwhelming the callee.
//!
//! # Modules
//!
//! - `async_utils` - The combinators: retry, pools, timeouts, debounce,
//!   throttle, polling, TTL caching, settle-all and batching
//! - `config` - Configuration management with environment variable loading
//! - `logging` - Duration formatting and timing helpers for tracing output
//! - `serialization` - Stable JSON serialization used for cache keys
//!
//! Every combinator owns its state. Nothing is shared between two wrapped
//! instances, and there are no module-level globals: build a
//! [`ToolkitConfig`] once at startup and hand its pieces to the call sites
//! that need them.

pub mod async_utils;
pub mod config;
pub mod logging;
pub mod serialization;

pub use async_utils::batch::{async_batch, BatchConfig};
pub use async_utils::cache::{AsyncCache, CacheError, CacheKeyMode};
pub use async_utils::debounce::{DebounceError, Debouncer};
pub use async_utils::poll::{poll_until, poll_until_notify, PollConfig, PollError};
pub use async_utils::pool::{async_pool, async_sequential, DEFAULT_CONCURRENCY};
pub use async_utils::result::{safe_async, safe_async_fn, AsyncResult, Panicked};
pub use async_utils::retry::{with_retry, with_retry_notify, RetryPolicy, RetryState};
pub use async_utils::settle::async_all_settled;
pub use async_utils::throttle::Throttler;
pub use async_utils::timeout::{with_timeout, with_timeout_message, TimeoutError, TimeoutGuard};
pub use async_utils::timer::{sleep, sleep_ms};

use config::{build_env_key, get_env_parse_or, ConfigBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur outside of the wrapped operations themselves
#[derive(Debug, Error)]
pub enum ToolkitError {
    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for toolkit operations
pub type Result<T> = std::result::Result<T, ToolkitError>;

/// Default environment prefix for [`ToolkitConfig::from_env`]
pub const ENV_PREFIX: &str = "ASYNC_TOOLKIT_";

/// Aggregate configuration for every configurable combinator
///
/// Meant to be built once in the application's composition root and passed
/// into the code that needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolkitConfig {
    /// Retry/backoff settings
    pub retry: RetryPolicy,
    /// Polling settings
    pub poll: PollConfig,
    /// Batch runner settings
    pub batch: BatchConfig,
    /// Concurrency limit for [`async_pool`]
    pub pool_concurrency: usize,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            poll: PollConfig::default(),
            batch: BatchConfig::default(),
            pool_concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ToolkitConfig {
    /// Create a configuration with every default
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the polling configuration
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Set the batch configuration
    pub fn with_batch(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }

    /// Set the pool concurrency limit
    pub fn with_pool_concurrency(mut self, limit: usize) -> Self {
        self.pool_concurrency = limit;
        self
    }
}

impl ConfigBuilder for ToolkitConfig {
    fn validate(&self) -> Result<()> {
        if self.pool_concurrency == 0 {
            return Err(ToolkitError::Config(
                "pool_concurrency must be at least 1".to_string(),
            ));
        }
        self.retry.validate()?;
        self.poll.validate()?;
        self.batch.validate()
    }

    fn from_env(prefix: &str) -> Result<Self> {
        Ok(Self {
            retry: RetryPolicy::from_env(&build_env_key(prefix, "retry_"))?,
            poll: PollConfig::from_env(&build_env_key(prefix, "poll_"))?,
            batch: BatchConfig::from_env(&build_env_key(prefix, "batch_"))?,
            pool_concurrency: get_env_parse_or(
                &build_env_key(prefix, "pool_concurrency"),
                DEFAULT_CONCURRENCY,
            )?,
        })
    }

    fn merge(&mut self, other: Self) -> &mut Self {
        self.retry.merge(other.retry);
        self.poll.merge(other.poll);
        self.batch.merge(other.batch);
        if other.pool_concurrency != DEFAULT_CONCURRENCY {
            self.pool_concurrency = other.pool_concurrency;
        }
        self
    }
}

/// Get version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_config_default() {
        let config = ToolkitConfig::default();
        assert_eq!(config.pool_concurrency, 5);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.poll.interval, Duration::from_secs(1));
        assert_eq!(config.batch.batch_size, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ToolkitConfig::new()
            .with_pool_concurrency(8)
            .with_retry(RetryPolicy::new(1))
            .with_batch(BatchConfig::new(4));

        assert_eq!(config.pool_concurrency, 8);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.batch.batch_size, 4);
    }

    #[test]
    fn test_config_rejects_zero_concurrency() {
        let config = ToolkitConfig::new().with_pool_concurrency(0);
        assert!(matches!(config.validate(), Err(ToolkitError::Config(_))));
    }

    #[test]
    fn test_config_from_env() {
        std::env::set_var("TOOLKIT_TEST_CFG_POOL_CONCURRENCY", "12");
        std::env::set_var("TOOLKIT_TEST_CFG_RETRY_MAX_RETRIES", "7");
        std::env::set_var("TOOLKIT_TEST_CFG_POLL_TIMEOUT_MS", "2500");

        let config = ToolkitConfig::from_env("TOOLKIT_TEST_CFG_").unwrap();
        assert_eq!(config.pool_concurrency, 12);
        assert_eq!(config.retry.max_retries, 7);
        assert_eq!(config.poll.timeout, Duration::from_millis(2500));
        assert_eq!(config.batch.batch_size, 10);

        std::env::remove_var("TOOLKIT_TEST_CFG_POOL_CONCURRENCY");
        std::env::remove_var("TOOLKIT_TEST_CFG_RETRY_MAX_RETRIES");
        std::env::remove_var("TOOLKIT_TEST_CFG_POLL_TIMEOUT_MS");
    }

    #[test]
    fn test_config_merge() {
        let mut base = ToolkitConfig::default();
        base.merge(ToolkitConfig::new().with_pool_concurrency(2));
        assert_eq!(base.pool_concurrency, 2);
    }

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
