use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Error, Result};

const INITIAL_WAIT: Duration = Duration::from_millis(1);

/// Polls `f` until it stops asking for a retry or `deadline` passes.
///
/// `f` receives the overall deadline and returns its status together with a
/// retry flag; the first `retry = false` result is returned as-is. Once the
/// deadline passes the last status is discarded in favor of
/// `TimedOut(timeout_msg)`; when the deadline is already past on entry, `f`
/// is never invoked. Between attempts the driver sleeps an exponentially
/// growing amount, clamped so the sleep never runs past the remaining
/// budget minus the duration of the attempt just made.
pub async fn retry_until_deadline<T, F, Fut>(
    deadline: Instant,
    retry_msg: &str,
    timeout_msg: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut(Instant) -> Fut,
    Fut: Future<Output = (Result<T>, bool)>,
{
    let mut wait_time = INITIAL_WAIT;
    loop {
        let attempt_start = Instant::now();
        if attempt_start >= deadline {
            return Err(Error::TimedOut(timeout_msg.to_string()));
        }

        let (result, retry) = f(deadline).await;
        if !retry {
            return result;
        }
        match &result {
            Ok(_) => tracing::trace!("{retry_msg} not yet complete, retrying"),
            Err(e) => tracing::trace!("{retry_msg} returned {e}, retrying"),
        }

        let attempt_duration = attempt_start.elapsed();
        let remaining = deadline.saturating_duration_since(Instant::now());
        match remaining.checked_sub(attempt_duration) {
            Some(budget) if !budget.is_zero() => {
                wait_time = std::cmp::min(wait_time * 5 / 4, budget);
                tokio::time::sleep(wait_time).await;
            }
            // Out of budget for another wait; the deadline check on the
            // next iteration produces the TimedOut.
            _ => {}
        }
    }
}
