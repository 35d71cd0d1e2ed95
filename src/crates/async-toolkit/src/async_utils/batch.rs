//! Fixed-size parallel batches
//!
//! Items are split into consecutive chunks of `batch_size`. All items of a
//! chunk run together; the next chunk starts only once the whole chunk has
//! finished, after an optional pause.

use crate::config::{build_env_key, get_env_duration_ms, get_env_parse, ConfigBuilder};
use crate::logging::timed;
use crate::{Result, ToolkitError};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Chunking and pacing for [`async_batch`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Items per chunk
    pub batch_size: usize,
    /// Pause after each chunk except the last
    pub delay_between_batches: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            delay_between_batches: Duration::ZERO,
        }
    }
}

impl BatchConfig {
    /// Chunks of `batch_size` items with no pause between them
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }

    /// Set the pause between consecutive chunks
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_between_batches = delay;
        self
    }
}

impl ConfigBuilder for BatchConfig {
    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ToolkitError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn from_env(prefix: &str) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            batch_size: get_env_parse(&build_env_key(prefix, "size"))?
                .unwrap_or(defaults.batch_size),
            delay_between_batches: get_env_duration_ms(&build_env_key(prefix, "delay_ms"))?
                .unwrap_or(defaults.delay_between_batches),
        })
    }

    fn merge(&mut self, other: Self) -> &mut Self {
        let defaults = Self::default();
        if other.batch_size != defaults.batch_size {
            self.batch_size = other.batch_size;
        }
        if other.delay_between_batches != defaults.delay_between_batches {
            self.delay_between_batches = other.delay_between_batches;
        }
        self
    }
}

/// Run `work` over `items` chunk by chunk
///
/// `work` receives each item with its index in the whole input, and the
/// results come back flattened in input order. The first failing item stops
/// the run: the rest of its chunk is dropped and later chunks never start.
/// A `batch_size` of 0 is treated as 1, with a warning.
///
/// # Example
///
/// ```rust
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// use async_toolkit::{async_batch, BatchConfig};
///
/// let config = BatchConfig::new(3);
/// let doubled = async_batch(1..=7, &config, |n, _index| async move {
///     Ok::<_, String>(n * 2)
/// })
/// .await;
/// assert_eq!(doubled, Ok(vec![2, 4, 6, 8, 10, 12, 14]));
/// # });
/// ```
pub async fn async_batch<I, F, Fut, R, E>(
    items: I,
    config: &BatchConfig,
    mut work: F,
) -> std::result::Result<Vec<R>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item, usize) -> Fut,
    Fut: Future<Output = std::result::Result<R, E>>,
{
    let batch_size = if config.batch_size == 0 {
        tracing::warn!("async_batch called with a batch size of 0, using 1");
        1
    } else {
        config.batch_size
    };
    let mut queue = items.into_iter().enumerate().peekable();
    let mut results = Vec::with_capacity(queue.size_hint().0);
    let mut chunk_number = 0;

    while queue.peek().is_some() {
        chunk_number += 1;
        let chunk: Vec<Fut> = queue
            .by_ref()
            .take(batch_size)
            .map(|(index, item)| work(item, index))
            .collect();

        let label = format!("batch {} ({} items)", chunk_number, chunk.len());
        results.extend(timed(&label, try_join_all(chunk)).await?);

        if queue.peek().is_some() && !config.delay_between_batches.is_zero() {
            tokio::time::sleep(config.delay_between_batches).await;
        }
    }

    Ok(results)
}
