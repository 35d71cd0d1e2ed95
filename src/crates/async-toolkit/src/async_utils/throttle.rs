//! Throttle for async work functions
//!
//! The first call executes immediately. Any call made while an execution is
//! running, or within `window` of the last execution's start, is dropped:
//! it resolves to `Ok(None)` without touching the work function and is
//! never queued for later.

use super::{share_work, SharedWork};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct WindowState {
    last_executed_at: Option<Instant>,
    is_executing: bool,
}

/// Clears `is_executing` when the admitted call finishes or is dropped
struct ExecutionGuard {
    state: Arc<Mutex<WindowState>>,
}

impl Drop for ExecutionGuard {
    fn drop(&mut self) {
        self.state.lock().is_executing = false;
    }
}

/// Throttled wrapper around an async work function
///
/// Clones share the same window.
///
/// # Example
///
/// ```rust,ignore
/// use async_toolkit::Throttler;
/// use std::time::Duration;
///
/// let save_draft = Throttler::new(Duration::from_secs(2), |draft: Draft| async move {
///     store.save(draft).await
/// });
///
/// match save_draft.call(draft).await? {
///     Some(saved) => println!("saved revision {}", saved.revision),
///     None => {} // dropped, a save ran moments ago
/// }
/// ```
pub struct Throttler<A, T, E> {
    window: Duration,
    work: SharedWork<A, T, E>,
    state: Arc<Mutex<WindowState>>,
}

impl<A, T, E> Clone for Throttler<A, T, E> {
    fn clone(&self) -> Self {
        Self {
            window: self.window,
            work: Arc::clone(&self.work),
            state: Arc::clone(&self.state),
        }
    }
}

impl<A, T, E> Throttler<A, T, E>
where
    A: 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    /// Wrap `work` so it runs at most once per `window`
    pub fn new<F, Fut>(window: Duration, work: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        Self {
            window,
            work: share_work(work),
            state: Arc::new(Mutex::new(WindowState::default())),
        }
    }

    /// Invoke the work function unless throttled
    ///
    /// The admission decision is made when `call` is invoked, not when the
    /// returned future is first polled. Returns `Ok(None)` for a dropped
    /// call, otherwise the work function's outcome.
    pub fn call(
        &self,
        args: A,
    ) -> impl Future<Output = std::result::Result<Option<T>, E>> + Send + 'static {
        let admitted = self.try_begin().map(|guard| (guard, (self.work)(args)));

        async move {
            match admitted {
                Some((_guard, work)) => work.await.map(Some),
                None => Ok(None),
            }
        }
    }

    /// Whether an admitted call is still running
    pub fn is_executing(&self) -> bool {
        self.state.lock().is_executing
    }

    /// Minimum spacing between execution starts
    pub fn window(&self) -> Duration {
        self.window
    }

    fn try_begin(&self) -> Option<ExecutionGuard> {
        let mut state = self.state.lock();
        let now = Instant::now();

        if state.is_executing {
            tracing::trace!("Throttled call dropped: execution in progress");
            return None;
        }
        if let Some(last) = state.last_executed_at {
            if now.duration_since(last) < self.window {
                tracing::trace!("Throttled call dropped: inside {:?} window", self.window);
                return None;
            }
        }

        state.last_executed_at = Some(now);
        state.is_executing = true;
        Some(ExecutionGuard {
            state: Arc::clone(&self.state),
        })
    }
}
