//! Bounded retry for transient failures.

use std::{future::Future, time::Duration};

use tokio::time::sleep;
use tracing::{error, warn};

use crate::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero behaves like one.
    pub max_attempts: usize,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Run `op` until it succeeds, fails with a non-transient error, or attempts run out.
pub async fn with_retry<T, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut op: impl FnMut() -> Fut,
) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1usize;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                warn!(operation = label, attempt, max_attempts, error = %e, "retrying");
                attempt += 1;
                if !policy.delay.is_zero() {
                    sleep(policy.delay).await;
                }
            }
            Err(e) => {
                if e.is_transient() {
                    error!(operation = label, attempts = attempt, error = %e, "giving up");
                }
                return Err(e);
            }
        }
    }
}
