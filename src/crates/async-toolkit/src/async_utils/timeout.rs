//! Timeout utilities for async operations
//!
//! [`with_timeout`] races an operation against a deadline. The operation is
//! not cancelled when the deadline wins: it keeps running on the runtime and
//! its eventual result is discarded. Downstream effects of a timed-out
//! operation must therefore be idempotent.

use crate::logging::format_duration;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Execute an async operation with a timeout
///
/// The operation is spawned onto the current tokio runtime, so it must be
/// `Send + 'static`. If the deadline passes first, the task is detached,
/// never aborted. A panic inside the operation resumes unwinding in the
/// caller.
///
/// # Example
///
/// ```rust,ignore
/// use async_toolkit::{with_timeout, TimeoutError};
/// use std::time::Duration;
///
/// match with_timeout(Duration::from_secs(1), upload(file)).await {
///     Ok(receipt) => println!("stored as {}", receipt.id),
///     Err(TimeoutError::Timeout { .. }) => println!("still uploading in the background"),
///     Err(e) => return Err(e.into()),
/// }
/// ```
pub async fn with_timeout<F, T, E>(
    duration: Duration,
    operation: F,
) -> std::result::Result<T, TimeoutError<E>>
where
    F: Future<Output = std::result::Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let message = format!("Operation timed out after {}", format_duration(duration));
    with_timeout_message(duration, message, operation).await
}

/// Like [`with_timeout`], with a caller-supplied timeout message
pub async fn with_timeout_message<F, T, E>(
    duration: Duration,
    message: impl Into<String>,
    operation: F,
) -> std::result::Result<T, TimeoutError<E>>
where
    F: Future<Output = std::result::Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let handle = tokio::spawn(operation);

    match tokio::time::timeout(duration, handle).await {
        Ok(Ok(Ok(result))) => Ok(result),
        Ok(Ok(Err(error))) => Err(TimeoutError::OperationFailed(error)),
        Ok(Err(join_error)) => {
            if join_error.is_panic() {
                std::panic::resume_unwind(join_error.into_panic());
            }
            Err(TimeoutError::Aborted)
        }
        Err(_elapsed) => {
            tracing::debug!(
                "Operation exceeded {}, leaving it running detached",
                format_duration(duration)
            );
            Err(TimeoutError::Timeout {
                duration,
                message: message.into(),
            })
        }
    }
}

/// Error type for timeout operations
#[derive(Debug)]
pub enum TimeoutError<E> {
    /// Operation completed but failed
    OperationFailed(E),
    /// Deadline passed before the operation settled
    Timeout {
        /// The deadline that was exceeded
        duration: Duration,
        /// Human-readable message
        message: String,
    },
    /// The runtime cancelled the spawned operation (e.g. during shutdown)
    Aborted,
}

impl<E> TimeoutError<E> {
    /// Whether the deadline won the race
    pub fn is_timeout(&self) -> bool {
        matches!(self, TimeoutError::Timeout { .. })
    }

    /// The operation's own error, if that is what happened
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            TimeoutError::OperationFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for TimeoutError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutError::OperationFailed(e) => write!(f, "Operation failed: {}", e),
            TimeoutError::Timeout { message, .. } => f.write_str(message),
            TimeoutError::Aborted => f.write_str("Operation was aborted by the runtime"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for TimeoutError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TimeoutError::OperationFailed(e) => Some(e),
            _ => None,
        }
    }
}

/// Deadline tracker started at creation time
///
/// Used by the polling loop to decide when to give up.
///
/// # Example
///
/// ```rust
/// use async_toolkit::TimeoutGuard;
/// use std::time::Duration;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let guard = TimeoutGuard::new(Duration::from_secs(30));
/// assert!(!guard.is_expired());
/// assert!(guard.remaining().is_some());
/// # });
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TimeoutGuard {
    started: Instant,
    /// `None` when `duration` reaches past the clock's range
    deadline: Option<Instant>,
    duration: Duration,
}

impl TimeoutGuard {
    /// Start tracking a deadline `duration` from now
    ///
    /// A duration too large to represent as an instant (such as
    /// `Duration::MAX`) never expires.
    pub fn new(duration: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: started.checked_add(duration),
            duration,
        }
    }

    /// Whether more than `duration` has passed since creation
    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() > deadline)
    }

    /// Time left before expiry, `None` once expired
    pub fn remaining(&self) -> Option<Duration> {
        match self.deadline {
            Some(deadline) => deadline.checked_duration_since(Instant::now()),
            None => Some(Duration::MAX),
        }
    }

    /// Time since the guard was created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Get the original timeout duration
    pub fn duration(&self) -> Duration {
        self.duration
    }
}
