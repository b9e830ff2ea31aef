//! Bounded retry combinator.
//!
//! [`with_retry`] runs an async operation up to `max_attempts` times. After
//! each attempt a caller-supplied decision function inspects the outcome
//! (success or failure) and says whether to stop, retry on the policy's
//! backoff schedule, or retry after an explicit delay. The combinator is used
//! by the writer's length policy, the image client, and text transport retry.

use crate::backend::BackoffConfig;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// What to do after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Accept this outcome as final.
    Done,
    /// Try again after the policy's backoff delay for this attempt.
    Retry,
    /// Try again after the given delay.
    RetryAfter(Duration),
}

/// Attempt budget and backoff schedule for [`with_retry`].
///
/// # Example
///
/// ```
/// use article_pipeline::retry::RetryPolicy;
///
/// let policy = RetryPolicy::new(3);
/// assert_eq!(policy.max_attempts, 3);
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Delay schedule used by [`RetryDecision::Retry`].
    pub backoff: BackoffConfig,
}

impl RetryPolicy {
    /// A policy with `max_attempts` attempts and the default backoff schedule.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: BackoffConfig::default(),
        }
    }

    /// Replace the backoff schedule.
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }
}

/// The final outcome of [`with_retry`] and how many attempts it took.
#[derive(Debug)]
pub struct Attempted<T, E> {
    /// Outcome of the last attempt made.
    pub result: Result<T, E>,
    /// Number of attempts made (1-indexed).
    pub attempts: u32,
}

/// Run `operation` until `decide` accepts an outcome or the budget runs out.
///
/// `operation` receives the 1-indexed attempt number and the previous
/// attempt's outcome (`None` on the first attempt), so it can adapt the next
/// request. `decide` receives each outcome and the attempt number. When the
/// budget is exhausted the last outcome is returned whatever it was.
pub async fn with_retry<T, E, Op, Fut, D>(
    policy: &RetryPolicy,
    mut operation: Op,
    mut decide: D,
) -> Attempted<T, E>
where
    Op: FnMut(u32, Option<&Result<T, E>>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    D: FnMut(&Result<T, E>, u32) -> RetryDecision,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    let mut previous: Option<Result<T, E>> = None;

    loop {
        let result = operation(attempt, previous.as_ref()).await;
        let decision = decide(&result, attempt);

        if attempt >= max_attempts || decision == RetryDecision::Done {
            return Attempted {
                result,
                attempts: attempt,
            };
        }

        let delay = match decision {
            RetryDecision::RetryAfter(delay) => delay,
            _ => policy.backoff.delay_for_attempt(attempt - 1),
        };
        debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "attempt rejected, retrying"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        previous = Some(result);
        attempt += 1;
    }
}
