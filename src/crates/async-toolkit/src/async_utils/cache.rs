//! TTL memoization for async work functions
//!
//! Results are stored per argument value, keyed by the arguments'
//! serialized JSON, and served until `ttl` has passed. There is no size
//! limit and no eviction beyond expiry: an expired entry is replaced the
//! next time its key is requested, and distinct keys accumulate. Concurrent
//! misses for the same key each call the work function.

use super::{share_work, SharedWork};
use crate::serialization::{to_json_key, to_stable_json};
use crate::ToolkitError;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// How call arguments are turned into cache keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheKeyMode {
    /// `serde_json` output as-is: struct fields and `serde_json::Value`
    /// object keys keep their declaration or insertion order, so equal
    /// maps built in different orders are different keys
    #[default]
    Naive,
    /// Object keys sorted recursively before serializing
    Canonical,
}

/// Failure of one cached call
#[derive(Debug, Error)]
pub enum CacheError<E> {
    /// The arguments could not be serialized into a key
    #[error("Failed to build cache key: {0}")]
    Key(ToolkitError),
    /// The work function failed; nothing was cached
    #[error("{0}")]
    Failed(E),
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    /// `None` when the TTL reaches past the clock's range
    expires_at: Option<Instant>,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

/// TTL-memoized wrapper around an async work function
///
/// Clones share the same entries.
///
/// # Example
///
/// ```rust,ignore
/// use async_toolkit::AsyncCache;
/// use std::time::Duration;
///
/// let banners = AsyncCache::new(Duration::from_secs(60), |region: String| async move {
///     load_banners(&region).await
/// });
///
/// let first = banners.call("eu".to_string()).await?;  // loads
/// let again = banners.call("eu".to_string()).await?;  // served from cache
/// ```
pub struct AsyncCache<A, T, E> {
    ttl: Duration,
    key_mode: CacheKeyMode,
    work: SharedWork<A, T, E>,
    entries: Arc<Mutex<HashMap<String, CacheEntry<T>>>>,
}

impl<A, T, E> Clone for AsyncCache<A, T, E> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            key_mode: self.key_mode,
            work: Arc::clone(&self.work),
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<A, T, E> AsyncCache<A, T, E>
where
    A: Serialize + 'static,
    T: Clone + Send + 'static,
    E: Send + 'static,
{
    /// Wrap `work` so its results are reused for `ttl`
    pub fn new<F, Fut>(ttl: Duration, work: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        Self {
            ttl,
            key_mode: CacheKeyMode::default(),
            work: share_work(work),
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Choose how arguments are turned into keys
    pub fn with_key_mode(mut self, mode: CacheKeyMode) -> Self {
        self.key_mode = mode;
        self
    }

    /// Return the cached value for `args`, or compute and store it
    ///
    /// Errors from the work function are returned and not cached.
    pub async fn call(&self, args: A) -> std::result::Result<T, CacheError<E>> {
        let key = self.key_for(&args).map_err(CacheError::Key)?;

        if let Some(value) = self.lookup(&key) {
            tracing::trace!("Cache hit for {}", key);
            return Ok(value);
        }

        tracing::trace!("Cache miss for {}", key);
        let value = (self.work)(args).await.map_err(CacheError::Failed)?;

        self.entries.lock().insert(
            key,
            CacheEntry {
                value: value.clone(),
                expires_at: Instant::now().checked_add(self.ttl),
            },
        );
        Ok(value)
    }

    /// Drop the entry for `args`, if present
    pub fn invalidate(&self, args: &A) -> crate::Result<bool> {
        let key = self.key_for(args)?;
        Ok(self.entries.lock().remove(&key).is_some())
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Entry lifetime; `Duration::MAX` keeps entries until invalidated
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key_for(&self, args: &A) -> crate::Result<String> {
        match self.key_mode {
            CacheKeyMode::Naive => to_json_key(args),
            CacheKeyMode::Canonical => to_stable_json(args),
        }
    }

    fn lookup(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(Instant::now()))
            .map(|entry| entry.value.clone())
    }
}
