//! Small async helpers for the daemon's wait states.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Poll `check` every `step` until it reports true or `timeout` elapses.
/// Returns whether the condition was observed. The check runs at least once
/// even with a zero timeout.
pub async fn poll_until<F, Fut>(timeout: Duration, step: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(step).await;
    }
}
