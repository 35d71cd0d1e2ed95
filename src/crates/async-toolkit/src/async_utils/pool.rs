//! Bounded-concurrency pool and the sequential baseline

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;

/// Default concurrency limit for [`async_pool`]
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Run `work` over `items` with at most `limit` futures in flight
///
/// Up to `limit` items start immediately; whenever any one of them settles
/// the next queued item is admitted. `results[i]` is always the output for
/// `items[i]`, whatever the completion order.
///
/// The first `Err` is returned as soon as it is observed. Items still in
/// flight at that point are dropped and queued items never start. Wrap the
/// work in [`safe_async`](super::result::safe_async) to keep going past
/// failures.
///
/// A `limit` of 0 is treated as 1.
///
/// # Example
///
/// ```rust
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// use async_toolkit::async_pool;
///
/// let doubled = async_pool(vec![1, 2, 3, 4, 5], 2, |n, _index| async move {
///     Ok::<_, String>(n * 2)
/// })
/// .await;
/// assert_eq!(doubled, Ok(vec![2, 4, 6, 8, 10]));
/// # });
/// ```
pub async fn async_pool<I, F, Fut, R, E>(
    items: I,
    limit: usize,
    mut work: F,
) -> std::result::Result<Vec<R>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item, usize) -> Fut,
    Fut: Future<Output = std::result::Result<R, E>>,
{
    let limit = if limit == 0 {
        tracing::warn!("async_pool called with a limit of 0, using 1");
        1
    } else {
        limit
    };

    let mut queue = items.into_iter().enumerate();
    let mut slots: Vec<Option<R>> = Vec::with_capacity(queue.size_hint().0);
    let mut in_flight = FuturesUnordered::new();

    loop {
        while in_flight.len() < limit {
            let Some((index, item)) = queue.next() else {
                break;
            };
            slots.push(None);
            let fut = work(item, index);
            in_flight.push(async move { (index, fut.await) });
        }

        match in_flight.next().await {
            Some((index, outcome)) => slots[index] = Some(outcome?),
            None => break,
        }
    }

    tracing::trace!("async_pool finished {} items", slots.len());
    Ok(slots.into_iter().flatten().collect())
}

/// Run `work` over `items` one at a time, in order
///
/// The next item does not start until the previous one has finished. The
/// first `Err` stops the run.
pub async fn async_sequential<I, F, Fut, R, E>(
    items: I,
    mut work: F,
) -> std::result::Result<Vec<R>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item, usize) -> Fut,
    Fut: Future<Output = std::result::Result<R, E>>,
{
    let items = items.into_iter();
    let mut results = Vec::with_capacity(items.size_hint().0);

    for (index, item) in items.enumerate() {
        results.push(work(item, index).await?);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    #[tokio::test]
    async fn test_pool_preserves_order() {
        let results = async_pool(vec![1, 2, 3, 4, 5], 2, |n, _| async move {
            Ok::<_, String>(n * 2)
        })
        .await
        .unwrap();

        assert_eq!(results, vec![2, 4, 6, 8, 10]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_order_with_reversed_completion() {
        // Later items finish first.
        let results = async_pool(0..6u64, 6, |n, index| async move {
            sleep(Duration::from_millis(100 - n * 10)).await;
            Ok::<_, String>((index, n))
        })
        .await
        .unwrap();

        assert_eq!(
            results,
            (0..6u64).map(|n| (n as usize, n)).collect::<Vec<_>>()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_respects_limit() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = async_pool(0..20u64, 3, |n, _| {
            let active = active.clone();
            let peak = peak.clone();
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(5 + (n % 4) * 7)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(n)
            }
        })
        .await
        .unwrap();

        assert_eq!(results.len(), 20);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_admits_on_any_completion() {
        // One slow item must not hold back the rest of the window.
        let start = Instant::now();
        let durations = vec![300u64, 10, 10, 10, 10];

        async_pool(durations, 2, |ms, _| async move {
            sleep(Duration::from_millis(ms)).await;
            Ok::<_, String>(())
        })
        .await
        .unwrap();

        assert!(start.elapsed() < Duration::from_millis(310));
    }

    #[tokio::test]
    async fn test_pool_fails_fast() {
        let started = Arc::new(AtomicUsize::new(0));

        let result = async_pool(vec![1, 2, 3, 4, 5, 6], 1, |n, _| {
            let started = started.clone();
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                if n == 2 {
                    Err(format!("item {} failed", n))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Err("item 2 failed".to_string()));
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pool_zero_limit_runs() {
        let results = async_pool(vec!["a", "b"], 0, |s, i| async move {
            Ok::<_, String>(format!("{}{}", s, i))
        })
        .await
        .unwrap();

        assert_eq!(results, vec!["a0", "b1"]);
    }

    #[tokio::test]
    async fn test_pool_empty_input() {
        let results: Vec<u8> = async_pool(Vec::<u8>::new(), 4, |n, _| async move {
            Ok::<_, String>(n)
        })
        .await
        .unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_never_overlaps() {
        let active = Arc::new(AtomicUsize::new(0));
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let start = Instant::now();

        let results = async_sequential(vec![30u64, 10, 20], |ms, index| {
            let active = active.clone();
            let order = order.clone();
            async move {
                assert_eq!(active.fetch_add(1, Ordering::SeqCst), 0);
                sleep(Duration::from_millis(ms)).await;
                order.lock().push(index);
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(ms)
            }
        })
        .await
        .unwrap();

        assert_eq!(results, vec![30, 10, 20]);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_sequential_stops_on_error() {
        let mut seen = Vec::new();

        let result = async_sequential(vec![1, 2, 3], |n, _| {
            seen.push(n);
            async move {
                if n == 2 {
                    Err("stop")
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Err("stop"));
        assert_eq!(seen, vec![1, 2]);
    }
}
