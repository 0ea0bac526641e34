//! Node retry policy.

use std::time::Duration;

/// How a compiled graph retries a failing node.
#[derive(Clone, Debug, PartialEq)]
pub enum RetryPolicy {
    /// Never retry; the first failure aborts the run.
    None,
    /// Exponential backoff: `base * multiplier^attempt`, capped at `max`.
    Exponential {
        max_retries: u32,
        base: Duration,
        max: Duration,
        multiplier: f64,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::None
    }
}

impl RetryPolicy {
    /// Builds an exponential backoff policy.
    pub fn exponential(max_retries: u32, base: Duration, max: Duration, multiplier: f64) -> Self {
        RetryPolicy::Exponential {
            max_retries,
            base,
            max,
            multiplier,
        }
    }

    /// Max number of retries after the initial attempt (0 for `None`).
    pub fn max_retries(&self) -> u32 {
        match self {
            RetryPolicy::None => 0,
            RetryPolicy::Exponential { max_retries, .. } => *max_retries,
        }
    }

    /// Delay before retry attempt `attempt` (0-based: the first retry is attempt 0).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            RetryPolicy::None => Duration::ZERO,
            RetryPolicy::Exponential {
                base,
                max,
                multiplier,
                ..
            } => {
                let scaled = base.as_secs_f64() * multiplier.powi(attempt as i32);
                Duration::from_secs_f64(scaled).min(*max)
            }
        }
    }
}
