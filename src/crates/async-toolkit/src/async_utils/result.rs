//! Failure as a value
//!
//! [`safe_async`] is the foundation for the combinators that must observe a
//! failure without propagating it. An `Err` is forwarded untouched; a panic
//! inside the work is caught and handed to the error type through
//! `From<Panicked>`.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use thiserror::Error;

/// Outcome of one async operation: exactly one of value or error
pub type AsyncResult<T, E> = std::result::Result<T, E>;

/// A work function panicked instead of returning
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("work function panicked: {message}")]
pub struct Panicked {
    /// Panic message, when the payload was a string
    pub message: String,
}

impl Panicked {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "<non-string panic payload>".to_string()
        };
        Self { message }
    }
}

impl From<Panicked> for String {
    fn from(panicked: Panicked) -> Self {
        panicked.to_string()
    }
}

/// Await a fallible future and return its outcome as a value
///
/// # Example
///
/// ```rust
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// use async_toolkit::safe_async;
///
/// let ok: Result<u32, String> = safe_async(async { Ok(7) }).await;
/// assert_eq!(ok, Ok(7));
///
/// let err: Result<u32, String> = safe_async(async { Err("offline".to_string()) }).await;
/// assert_eq!(err, Err("offline".to_string()));
/// # });
/// ```
pub async fn safe_async<Fut, T, E>(future: Fut) -> AsyncResult<T, E>
where
    Fut: Future<Output = std::result::Result<T, E>>,
    E: From<Panicked>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Panicked::from_payload(payload).into()),
    }
}

/// Like [`safe_async`], for a zero-argument work function
///
/// A panic raised while calling `work` (before any future exists) is caught
/// as well.
pub async fn safe_async_fn<F, Fut, T, E>(work: F) -> AsyncResult<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: From<Panicked>,
{
    match std::panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(future) => safe_async(future).await,
        Err(payload) => Err(Panicked::from_payload(payload).into()),
    }
}
