//! Debounce for async work functions
//!
//! A burst of calls collapses into a single execution with the arguments of
//! the most recent call, once `delay` has passed without a newer call.
//! Every call gets its own future. Superseded calls resolve to
//! [`DebounceError::Cancelled`]; only the surviving call sees the real
//! outcome.

use super::result::Panicked;
use super::{share_work, SharedWork};
use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// Failure of one debounced call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebounceError<E> {
    /// A newer call superseded this one
    #[error("Debounced call cancelled")]
    Cancelled,
    /// The work function ran and failed
    #[error("{0}")]
    Failed(E),
    /// The work function panicked
    #[error("{0}")]
    Panicked(Panicked),
}

impl<E> DebounceError<E> {
    /// Whether this call was superseded rather than executed
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DebounceError::Cancelled)
    }
}

type Outcome<T, E> = std::result::Result<T, DebounceError<E>>;

struct PendingCall<T, E> {
    generation: u64,
    sender: Option<oneshot::Sender<Outcome<T, E>>>,
    /// Dropping this wakes the pending call's timer task so it exits early
    timer: Option<oneshot::Sender<()>>,
}

struct Shared<A, T, E> {
    delay: Duration,
    work: SharedWork<A, T, E>,
    pending: Mutex<PendingCall<T, E>>,
}

impl<A, T, E> Shared<A, T, E> {
    /// Replace the pending call, rejecting the one it supersedes
    fn supersede(
        &self,
        sender: Option<oneshot::Sender<Outcome<T, E>>>,
        timer: Option<oneshot::Sender<()>>,
    ) -> u64 {
        let mut pending = self.pending.lock();
        if let Some(previous) = pending.sender.take() {
            tracing::trace!("Debounced call {} superseded", pending.generation);
            let _ = previous.send(Err(DebounceError::Cancelled));
        }
        pending.timer = timer;
        pending.generation += 1;
        pending.sender = sender;
        pending.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.pending.lock().generation == generation
    }

    fn settle(&self, generation: u64, outcome: Outcome<T, E>) {
        let mut pending = self.pending.lock();
        if pending.generation == generation {
            if let Some(sender) = pending.sender.take() {
                let _ = sender.send(outcome);
            }
        }
    }
}

/// Debounced wrapper around an async work function
///
/// Clones share the same pending call.
///
/// # Example
///
/// ```rust,ignore
/// use async_toolkit::Debouncer;
/// use std::time::Duration;
///
/// let search = Debouncer::new(Duration::from_millis(300), |query: String| async move {
///     search_members(&query).await
/// });
///
/// // Only "ali" is searched; the first two futures resolve to Cancelled.
/// let a = search.call("a".into());
/// let al = search.call("al".into());
/// let ali = search.call("ali".into());
/// ```
pub struct Debouncer<A, T, E> {
    shared: Arc<Shared<A, T, E>>,
}

impl<A, T, E> Clone for Debouncer<A, T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A, T, E> Debouncer<A, T, E>
where
    A: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    /// Wrap `work` so it runs `delay` after the last call in a burst
    pub fn new<F, Fut>(delay: Duration, work: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                delay,
                work: share_work(work),
                pending: Mutex::new(PendingCall {
                    generation: 0,
                    sender: None,
                    timer: None,
                }),
            }),
        }
    }

    /// Schedule a call with `args`
    ///
    /// The previous pending call, if any, is rejected with
    /// [`DebounceError::Cancelled`] before this method returns. That includes
    /// a call whose work is already running: its future is rejected, the
    /// work runs to completion and its result is discarded.
    ///
    /// Must be called from within a tokio runtime.
    pub fn call(&self, args: A) -> impl Future<Output = Outcome<T, E>> + Send + 'static {
        let (sender, receiver) = oneshot::channel();
        let (timer, superseded) = oneshot::channel::<()>();
        let generation = self.shared.supersede(Some(sender), Some(timer));
        let shared = Arc::clone(&self.shared);

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(shared.delay) => {}
                _ = superseded => return,
            }
            if !shared.is_current(generation) {
                return;
            }

            tracing::trace!("Debounced call {} executing", generation);
            let work = Arc::clone(&shared.work);
            let outcome = match AssertUnwindSafe(async move { work(args).await })
                .catch_unwind()
                .await
            {
                Ok(result) => result.map_err(DebounceError::Failed),
                Err(payload) => Err(DebounceError::Panicked(Panicked::from_payload(payload))),
            };
            shared.settle(generation, outcome);
        });

        async move { receiver.await.unwrap_or(Err(DebounceError::Cancelled)) }
    }

    /// Reject the pending call, if any, without scheduling a new one
    ///
    /// A call still waiting for its timer never runs.
    pub fn cancel(&self) {
        self.shared.supersede(None, None);
    }

    /// Whether a call is waiting for its timer or still executing
    pub fn is_pending(&self) -> bool {
        self.shared.pending.lock().sender.is_some()
    }

    /// Quiet period before the work function runs
    pub fn delay(&self) -> Duration {
        self.shared.delay
    }
}
