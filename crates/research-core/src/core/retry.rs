// crates/research-core/src/core/retry.rs
// ============================================================================
// Module: Retry and Backoff Policy
// Description: Exponential backoff with jitter for jobs, steps, and fetches.
// Purpose: Provide one deterministic-capable retry schedule for the engine.
// Dependencies: rand, serde
// ============================================================================

//! ## Overview
//! Jobs, run steps, and source fetches share a single retry model: a bounded
//! attempt count with exponential backoff between attempts. Jitter spreads
//! retries from concurrent workers; tests disable it by setting the jitter
//! fraction to zero so schedules are exactly reproducible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Exponential backoff policy with bounded attempts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts before an item is terminally failed.
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub base_delay_ms: i64,
    /// Multiplier applied per additional attempt.
    pub factor: f64,
    /// Upper bound on a single delay, in milliseconds.
    pub max_delay_ms: i64,
    /// Fraction of the delay randomized as jitter, in `[0, 1]`.
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            factor: 2.0,
            max_delay_ms: 300_000,
            jitter_fraction: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Returns a policy without jitter, for reproducible schedules.
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter_fraction = 0.0;
        self
    }

    /// Returns the backoff delay in milliseconds for a completed attempt
    /// number (1-based), without jitter.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        reason = "Delays are bounded by max_delay_ms, far below either limit."
    )]
    pub fn delay_ms(&self, attempt: u32) -> i64 {
        let exponent = attempt.saturating_sub(1);
        let mut delay = self.base_delay_ms as f64;
        for _ in 0..exponent {
            delay *= self.factor;
            if delay >= self.max_delay_ms as f64 {
                return self.max_delay_ms;
            }
        }
        (delay as i64).min(self.max_delay_ms)
    }

    /// Returns the jittered time of the next retry after a failed attempt.
    ///
    /// `attempt` is the 1-based number of the attempt that just failed.
    /// Jitter widens the delay by up to `jitter_fraction` of its value. The
    /// attempt cap is not consulted; callers owning their own attempt budget
    /// use this directly.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        reason = "Jitter spans are bounded by max_delay_ms, far below either limit."
    )]
    pub fn next_retry_time(&self, attempt: u32, now: Timestamp) -> Timestamp {
        let base = self.delay_ms(attempt);
        let jitter_span = (base as f64 * self.jitter_fraction) as i64;
        let jitter = if jitter_span > 0 {
            rand::thread_rng().gen_range(0..=jitter_span)
        } else {
            0
        };
        now.plus_millis(base.saturating_add(jitter))
    }

    /// Decides the outcome of a failed attempt against this policy's cap.
    ///
    /// `attempt` is the 1-based number of the attempt that just failed.
    #[must_use]
    pub fn on_failure(&self, attempt: u32, now: Timestamp) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::Exhausted;
        }
        RetryDecision::RetryAt(self.next_retry_time(attempt, now))
    }
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Outcome of applying the retry policy to a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry no earlier than the given time.
    RetryAt(Timestamp),
    /// The attempt budget is spent; fail terminally.
    Exhausted,
}
