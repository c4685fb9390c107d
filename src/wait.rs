//! Bounded polling on the session frontier.
//!
//! Used both for the initial load (`above = 0`) and for growth after a
//! reveal (`above = frontier`). A timeout is reported as `Ok(None)`, never as
//! an error, so callers can turn it into a termination condition.

use std::time::Duration;

use tokio::time::{Instant, sleep, timeout_at};

use crate::{Session, SessionError};

/// Deadline used when `start + timeout` is not representable.
const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Polls `visible_count` until it exceeds `above` or the policy's timeout
/// elapses. Returns the new count, or `None` on timeout.
pub async fn wait_for_count<S>(
    session: &mut S,
    above: usize,
    policy: &WaitPolicy,
) -> Result<Option<usize>, SessionError>
where
    S: Session + ?Sized,
{
    let start = Instant::now();
    let deadline = start
        .checked_add(policy.timeout)
        .unwrap_or_else(|| start + MAX_WAIT);
    loop {
        // A poll that hangs must not outlive the deadline.
        let count = match timeout_at(deadline, session.visible_count()).await {
            Ok(result) => result?,
            Err(_) => return Ok(None),
        };
        if count > above {
            return Ok(Some(count));
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        sleep(policy.poll_interval.min(deadline - now)).await;
    }
}
