//! Retry policy for task attempts.
//!
//! A task gets `max_retries + 1` attempts in total, with a fixed sleep of
//! `retry_delay` between a failed attempt and the next one.

use std::time::Duration;

use taskweave_types::task::TaskSpec;

/// Retry settings extracted from a task spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_spec(spec: &TaskSpec) -> Self {
        Self {
            max_retries: spec.max_retries,
            delay: spec.retry_delay,
        }
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Stateless retry decisions; all logic lives in associated functions that
/// take the policy as a parameter.
pub struct RetryHandler;

impl RetryHandler {
    /// Whether another attempt is allowed after `retries_used` retries have
    /// already been consumed (0 after the first failed try).
    pub fn should_retry(policy: &RetryPolicy, retries_used: u32) -> bool {
        retries_used < policy.max_retries
    }

    /// Sleep before the next attempt.
    pub fn next_delay(policy: &RetryPolicy) -> Duration {
        policy.delay
    }
}
