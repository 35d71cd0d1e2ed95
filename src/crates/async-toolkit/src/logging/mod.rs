//! Tracing helpers shared by the combinators
//!
//! Nothing here installs a subscriber. Events are emitted under the
//! `async_toolkit` target and stay silent until the application sets one up.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Await `future` and log how long it took under `label`
///
/// ```rust,ignore
/// let rows = timed("member sync", sync_members(&client)).await?;
/// ```
pub async fn timed<F: Future>(label: &str, future: F) -> F::Output {
    let started = Instant::now();
    tracing::trace!("{} started", label);

    let output = future.await;

    tracing::debug!("{} finished in {}", label, format_duration(started.elapsed()));
    output
}

/// Render a duration with the coarsest unit that keeps it readable
///
/// ```rust
/// use async_toolkit::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_millis(1000)), "1000ms");
/// assert_eq!(format_duration(Duration::from_millis(12_500)), "12.5s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    match millis {
        0 => format!("{}μs", duration.as_micros()),
        1..=9_999 => format!("{}ms", millis),
        10_000..=59_999 => format!("{:.1}s", duration.as_secs_f64()),
        _ => {
            let secs = duration.as_secs();
            format!("{}m{}s", secs / 60, secs % 60)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_units() {
        let cases = [
            (Duration::from_micros(250), "250μs"),
            (Duration::from_millis(1), "1ms"),
            (Duration::from_millis(450), "450ms"),
            (Duration::from_millis(9_999), "9999ms"),
            (Duration::from_millis(30_000), "30.0s"),
            (Duration::from_secs(125), "2m5s"),
        ];
        for (duration, expected) in cases {
            assert_eq!(format_duration(duration), expected, "{:?}", duration);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_passes_output_through() {
        let output = timed("chunk", async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            "done"
        })
        .await;
        assert_eq!(output, "done");
    }
}
