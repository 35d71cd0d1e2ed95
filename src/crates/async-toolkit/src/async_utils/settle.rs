//! Settle-all: run every future, keep every outcome

use super::result::{safe_async, AsyncResult, Panicked};
use futures::future::join_all;
use std::future::Future;

/// Run all `futures` concurrently and collect each outcome in input order
///
/// Never short-circuits: a failing or panicking future only affects its own
/// slot.
///
/// # Example
///
/// ```rust
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// use async_toolkit::async_all_settled;
/// use futures::future::BoxFuture;
/// use futures::FutureExt;
///
/// let lookups: Vec<BoxFuture<'static, Result<u32, String>>> = vec![
///     async { Ok(1) }.boxed(),
///     async { Err("not found".to_string()) }.boxed(),
///     async { Ok(3) }.boxed(),
/// ];
///
/// let settled = async_all_settled(lookups).await;
/// assert_eq!(settled, vec![Ok(1), Err("not found".to_string()), Ok(3)]);
/// # });
/// ```
pub async fn async_all_settled<I, Fut, T, E>(futures: I) -> Vec<AsyncResult<T, E>>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: From<Panicked>,
{
    let outcomes = join_all(futures.into_iter().map(safe_async)).await;

    let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
    tracing::debug!(
        "Settled {} operations ({} failed)",
        outcomes.len(),
        failed
    );
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    fn delayed(ms: u64, outcome: Result<&'static str, String>) -> BoxFuture<'static, Result<&'static str, String>> {
        async move {
            sleep(Duration::from_millis(ms)).await;
            outcome
        }
        .boxed()
    }

    #[tokio::test(start_paused = true)]
    async fn test_mixed_outcomes_in_input_order() {
        let settled = async_all_settled(vec![
            delayed(30, Ok("s1")),
            delayed(10, Err("e1".to_string())),
            delayed(20, Ok("s2")),
        ])
        .await;

        assert_eq!(
            settled,
            vec![Ok("s1"), Err("e1".to_string()), Ok("s2")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_concurrently() {
        let start = Instant::now();
        let settled =
            async_all_settled((0..5).map(|_| delayed(100, Ok("done")))).await;

        assert_eq!(settled.len(), 5);
        assert!(start.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_all_failures_still_settle() {
        let settled = async_all_settled(vec![
            delayed(0, Err("first".to_string())),
            delayed(0, Err("second".to_string())),
        ])
        .await;

        assert_eq!(
            settled,
            vec![Err("first".to_string()), Err("second".to_string())]
        );
    }

    #[tokio::test]
    async fn test_panic_is_captured_in_its_slot() {
        let futures: Vec<BoxFuture<'static, Result<u32, String>>> = vec![
            async { Ok(1) }.boxed(),
            async {
                let limits: Vec<u32> = Vec::new();
                Ok(limits[3])
            }
            .boxed(),
            async { Ok(3) }.boxed(),
        ];

        let settled = async_all_settled(futures).await;

        assert_eq!(settled[0], Ok(1));
        assert!(settled[1]
            .as_ref()
            .unwrap_err()
            .contains("work function panicked"));
        assert_eq!(settled[2], Ok(3));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let settled: Vec<Result<u8, String>> =
            async_all_settled(Vec::<BoxFuture<'static, Result<u8, String>>>::new()).await;
        assert!(settled.is_empty());
    }
}
