//! Fixed-interval bounded retry shared by the pairing and thermal flows.
//!
//! A [`RetryPolicy`] is either count-bounded or deadline-bounded and the caller
//! picks the variant when building it. Failed attempts are separated by the
//! same sleep every time: no jitter, no exponential growth. Once the budget is
//! spent the last error is returned exactly as the operation produced it.
//!
//! Timing goes through the tokio clock, so tests can drive multi-minute
//! policies with a paused runtime.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::warn;

/// Sleep between attempts when a policy does not override it.
pub const DEFAULT_SLEEP: Duration = Duration::from_millis(1000);

/// Budget for [`retry`] and [`retry_when`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Run the operation at most `max_attempts` times.
    Attempts {
        max_attempts: u32,
        sleep_between: Duration,
    },
    /// Keep retrying while less than `max_elapsed` has passed since the first
    /// attempt started.
    Deadline {
        max_elapsed: Duration,
        sleep_between: Duration,
    },
}

impl RetryPolicy {
    pub fn attempts(max_attempts: u32) -> Self {
        RetryPolicy::Attempts {
            max_attempts,
            sleep_between: DEFAULT_SLEEP,
        }
    }

    pub fn deadline(max_elapsed: Duration) -> Self {
        RetryPolicy::Deadline {
            max_elapsed,
            sleep_between: DEFAULT_SLEEP,
        }
    }

    pub fn with_sleep(self, sleep_between: Duration) -> Self {
        match self {
            RetryPolicy::Attempts { max_attempts, .. } => RetryPolicy::Attempts {
                max_attempts,
                sleep_between,
            },
            RetryPolicy::Deadline { max_elapsed, .. } => RetryPolicy::Deadline {
                max_elapsed,
                sleep_between,
            },
        }
    }

    pub fn sleep_between(&self) -> Duration {
        match *self {
            RetryPolicy::Attempts { sleep_between, .. }
            | RetryPolicy::Deadline { sleep_between, .. } => sleep_between,
        }
    }

    /// Whether another attempt may follow `attempts_made` failures.
    fn allows_another(&self, attempts_made: u32, started: Instant) -> bool {
        match *self {
            RetryPolicy::Attempts { max_attempts, .. } => attempts_made < max_attempts,
            RetryPolicy::Deadline { max_elapsed, .. } => started.elapsed() < max_elapsed,
        }
    }
}

/// Runs `operation` until it succeeds or `policy` is exhausted.
///
/// The operation always runs at least once, even for a zero budget.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, operation: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_when(policy, |_| true, operation).await
}

/// Like [`retry`], but an error for which `should_retry` returns `false` is
/// returned immediately without consuming the rest of the budget.
pub async fn retry_when<T, E, F, Fut, P>(
    policy: RetryPolicy,
    should_retry: P,
    mut operation: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let started = Instant::now();
    let mut attempts_made = 0u32;

    loop {
        attempts_made += 1;
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !should_retry(&err) || !policy.allows_another(attempts_made, started) {
            return Err(err);
        }

        warn!(
            attempt = attempts_made,
            error = %err,
            "attempt failed; retrying in {:?}",
            policy.sleep_between()
        );
        sleep(policy.sleep_between()).await;
    }
}
