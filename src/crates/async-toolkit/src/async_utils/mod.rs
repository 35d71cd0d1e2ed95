//! Async combinators for common concurrency patterns
//!
//! Each combinator takes one or more work functions (closures returning a
//! future of `Result<T, E>`) plus configuration, and returns either a
//! wrapped callable or the awaited result:
//!
//! - `result` - `safe_async`: turn failure (including panics) into a value
//! - `timer` - `sleep`
//! - `retry` - Retry with deterministic exponential backoff
//! - `pool` - Bounded-concurrency pool and the sequential baseline
//! - `timeout` - Race an operation against a deadline, without cancelling it
//! - `debounce` - Collapse bursts of calls into the last one
//! - `throttle` - At most one execution per window, extra calls dropped
//! - `poll` - Poll until a predicate holds or a deadline passes
//! - `cache` - TTL memoization keyed by serialized arguments
//! - `settle` - Run everything, never short-circuit
//! - `batch` - Fixed-size parallel chunks with an optional pause between them
//!
//! # Example
//!
//! ```rust,ignore
//! use async_toolkit::{async_pool, with_retry, with_timeout, RetryPolicy};
//! use std::time::Duration;
//!
//! async fn upload_all(files: Vec<String>) -> Result<Vec<u64>, String> {
//!     let policy = RetryPolicy::new(3).with_initial_delay(Duration::from_millis(200));
//!
//!     async_pool(files, 4, |file, _index| {
//!         let policy = policy.clone();
//!         async move {
//!             with_retry(&policy, || {
//!                 let file = file.clone();
//!                 async move {
//!                     with_timeout(Duration::from_secs(10), upload(file))
//!                         .await
//!                         .map_err(|e| e.to_string())
//!                 }
//!             })
//!             .await
//!         }
//!     })
//!     .await
//! }
//! ```

pub mod batch;
pub mod cache;
pub mod debounce;
pub mod poll;
pub mod pool;
pub mod result;
pub mod retry;
pub mod settle;
pub mod throttle;
pub mod timeout;
pub mod timer;

use futures::future::BoxFuture;
use std::sync::Arc;

/// Type-erased work function shared by the wrapper combinators
pub(crate) type SharedWork<A, T, E> =
    Arc<dyn Fn(A) -> BoxFuture<'static, std::result::Result<T, E>> + Send + Sync>;

pub(crate) fn share_work<A, F, Fut, T, E>(work: F) -> SharedWork<A, T, E>
where
    A: 'static,
    T: 'static,
    E: 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = std::result::Result<T, E>> + Send + 'static,
{
    Arc::new(move |args: A| -> BoxFuture<'static, std::result::Result<T, E>> {
        Box::pin(work(args))
    })
}
