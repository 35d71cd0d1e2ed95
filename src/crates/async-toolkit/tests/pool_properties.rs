//! Property tests for pool ordering and its concurrency ceiling

use async_toolkit::async_pool;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn pool_results_follow_input_order(
        jobs in prop::collection::vec((any::<i32>(), 0u64..50), 0..40),
        limit in 1usize..8,
    ) {
        let runtime = paused_runtime();
        let expected: Vec<i64> = jobs.iter().map(|(value, _)| *value as i64 * 2).collect();

        let results = runtime.block_on(async_pool(jobs, limit, |(value, delay_ms), _| async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Ok::<_, String>(value as i64 * 2)
        }))
        .unwrap();

        prop_assert_eq!(results, expected);
    }

    #[test]
    fn pool_never_exceeds_limit(
        delays in prop::collection::vec(0u64..30, 1..40),
        limit in 1usize..6,
    ) {
        let runtime = paused_runtime();
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let total = delays.len();

        let results = runtime.block_on(async_pool(delays, limit, |delay_ms, index| {
            let in_flight = &in_flight;
            let peak = &peak;
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(index)
            }
        }))
        .unwrap();

        prop_assert_eq!(results, (0..total).collect::<Vec<_>>());
        prop_assert!(peak.load(Ordering::SeqCst) <= limit);
        prop_assert!(peak.load(Ordering::SeqCst) >= 1);
    }
}
