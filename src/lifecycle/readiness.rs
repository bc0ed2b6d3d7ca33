//! Readiness probes and the uniform backoff poll that drives them.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::Instant;

use crate::engine::Endpoint;
use crate::error::ServiceFailure;

/// Upper bound for the sleep between two probe attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(2);

const MIN_BACKOFF: Duration = Duration::from_millis(1);

/// Longest readiness budget honoured; larger budgets are clamped to it.
pub const MAX_WAIT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Boxed future returned by a single probe attempt.
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ServiceFailure>> + Send + 'a>>;

/// One readiness check against a starting service.
///
/// Implementations must be safe to call repeatedly: any connection opened by
/// an attempt is closed or dropped before the attempt returns.
pub trait ReadinessProbe: Send + Sync {
    /// Attempt one check against `endpoint`.
    fn check<'a>(&'a self, endpoint: &'a Endpoint) -> ProbeFuture<'a>;
}

/// Backoff schedule for the readiness poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_wait: Duration,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy with the default backoff cap.
    ///
    /// The initial backoff is kept between one millisecond and
    /// [`MAX_BACKOFF`]. Budgets beyond [`MAX_WAIT`] are clamped so the poll
    /// deadline always fits in an [`Instant`].
    #[must_use]
    pub fn new(max_wait: Duration, initial_backoff: Duration) -> Self {
        Self {
            max_wait: max_wait.min(MAX_WAIT),
            initial_backoff: initial_backoff.clamp(MIN_BACKOFF, MAX_BACKOFF),
            max_backoff: MAX_BACKOFF,
        }
    }

    /// Return the overall polling budget.
    #[must_use]
    pub const fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Return the first sleep between attempts.
    #[must_use]
    pub const fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    fn next_backoff(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_backoff)
    }
}

/// Outcome of a poll that ran out of budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotReady {
    /// Number of probe attempts made.
    pub attempts: u32,
    /// Wall-clock time spent polling.
    pub waited: Duration,
    /// Failure reported by the last attempt.
    pub last_failure: ServiceFailure,
}

/// Poll `probe` until it succeeds or the policy's budget is spent.
///
/// The first attempt runs immediately, so a zero budget performs exactly one
/// attempt. Every attempt is bounded by the remaining budget, but never by
/// less than the current backoff interval, which keeps the overrun past the
/// deadline within one interval.
///
/// # Errors
///
/// Returns [`NotReady`] with the attempt count and the last failure once the
/// budget is exhausted.
pub async fn wait_until_ready(
    probe: &dyn ReadinessProbe,
    endpoint: &Endpoint,
    policy: RetryPolicy,
) -> Result<u32, NotReady> {
    let started = Instant::now();
    // `None` only when the clock cannot represent the deadline.
    let deadline = started.checked_add(policy.max_wait);
    let mut backoff = policy.initial_backoff;
    let mut attempts: u32 = 0;

    loop {
        attempts = attempts.saturating_add(1);
        let remaining = time_left(deadline, Instant::now(), policy.max_wait);
        let attempt_budget = remaining.max(backoff);

        let failure = match tokio::time::timeout(attempt_budget, probe.check(endpoint)).await {
            Ok(Ok(())) => {
                tracing::debug!(%endpoint, attempts, "readiness probe succeeded");
                return Ok(attempts);
            }
            Ok(Err(failure)) => failure,
            Err(_) => ServiceFailure::new(format!(
                "probe attempt timed out after {attempt_budget:?}"
            )),
        };
        tracing::debug!(%endpoint, attempts, %failure, "readiness probe failed");

        let now = Instant::now();
        if deadline.is_some_and(|limit| now >= limit) {
            return Err(NotReady {
                attempts,
                waited: now.saturating_duration_since(started),
                last_failure: failure,
            });
        }

        let sleep_for = backoff.min(time_left(deadline, now, policy.max_wait));
        tokio::time::sleep(sleep_for).await;
        backoff = policy.next_backoff(backoff);
    }
}

fn time_left(deadline: Option<Instant>, now: Instant, max_wait: Duration) -> Duration {
    deadline.map_or(max_wait, |limit| limit.saturating_duration_since(now))
}
