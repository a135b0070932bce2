//! # Backoff policy for reconnect attempts.
//!
//! [`BackoffStrategy`] is the seam the coordinator consults when a connection attempt
//! fails: it maps the number of consecutive failures since the last successful open to
//! the delay before the next attempt. It must be pure, the same attempt always maps to
//! the same base delay.
//!
//! [`BackoffPolicy`] is the shipped strategy. It is parameterized by:
//! - [`BackoffPolicy::first`] the delay after the first failure;
//! - [`BackoffPolicy::curve`] how the base delay grows (constant, linear, exponential);
//! - [`BackoffPolicy::max`] the ceiling;
//! - [`BackoffPolicy::floor`] the lowest delay jitter may produce;
//! - [`BackoffPolicy::jitter`] randomization applied on top of the base.
//!
//! Attempts are 1-based: attempt `1` is the first retry after a failure. The base delay
//! for attempt `n` is derived from `n - 1` steps along the curve, clamped to `max`, then
//! jitter is applied and the result is clamped into `[floor, max]`. Because the base is
//! derived purely from the attempt number, jitter output never feeds back into later
//! attempts.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use tether::{BackoffCurve, BackoffPolicy, BackoffStrategy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     floor: Duration::ZERO,
//!     curve: BackoffCurve::Exponential { factor: 2.0 },
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
//! assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
//! // 100ms × 2^10 = 102_400ms → capped at max=10s
//! assert_eq!(backoff.delay_for(11), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Maps an attempt number to the delay before that reconnect attempt.
///
/// Implementations must be pure and must never return a delay that would let the
/// coordinator spin (a zero delay on every attempt is legal only when the caller asks
/// for it explicitly).
pub trait BackoffStrategy: Send + Sync + 'static {
    /// Delay before reconnect attempt `attempt` (1-based, reset after a successful open).
    fn delay_for(&self, attempt: u32) -> Duration;
}

/// Growth curve of the base delay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BackoffCurve {
    /// Every attempt waits [`BackoffPolicy::first`].
    Constant,
    /// `first + step × (attempt - 1)`.
    Linear {
        /// Increment added per attempt.
        step: Duration,
    },
    /// `first × factor^(attempt - 1)`.
    Exponential {
        /// Multiplicative growth factor (`>= 1.0` recommended).
        factor: f64,
    },
}

/// Reconnect backoff policy.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first reconnect attempt.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Lower bound applied after jitter.
    pub floor: Duration,
    /// Growth of the base delay.
    pub curve: BackoffCurve,
    /// Jitter policy to prevent reconnect stampedes.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a policy with:
    /// - `first = 1s`;
    /// - `curve = Exponential { factor: 2.0 }`;
    /// - `max = 30s`;
    /// - `floor = 100ms`;
    /// - `jitter = None`.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(30),
            floor: Duration::from_millis(100),
            curve: BackoffCurve::Exponential { factor: 2.0 },
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Constant delay, no jitter.
    pub fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            floor: Duration::ZERO,
            curve: BackoffCurve::Constant,
            jitter: JitterPolicy::None,
        }
    }

    /// Linear growth from `first` by `step`, capped at `max`.
    pub fn linear(first: Duration, step: Duration, max: Duration) -> Self {
        Self {
            first,
            max,
            floor: Duration::ZERO,
            curve: BackoffCurve::Linear { step },
            jitter: JitterPolicy::None,
        }
    }

    /// Exponential growth from `first` by `factor`, capped at `max`.
    pub fn exponential(first: Duration, factor: f64, max: Duration) -> Self {
        Self {
            first,
            max,
            floor: Duration::ZERO,
            curve: BackoffCurve::Exponential { factor },
            jitter: JitterPolicy::None,
        }
    }

    /// Returns the same policy with the given jitter.
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Returns the same policy with the given floor.
    pub fn with_floor(mut self, floor: Duration) -> Self {
        self.floor = floor;
        self
    }

    /// Base delay for `attempt` before jitter, clamped to [`BackoffPolicy::max`].
    ///
    /// Non-finite or negative intermediate values (overflowing exponentials, negative
    /// factors) clamp to `max`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let steps = attempt.saturating_sub(1);
        let max_secs = self.max.as_secs_f64();
        let first_secs = self.first.as_secs_f64();

        let unclamped_secs = match self.curve {
            BackoffCurve::Constant => first_secs,
            BackoffCurve::Linear { step } => first_secs + step.as_secs_f64() * f64::from(steps),
            BackoffCurve::Exponential { factor } => {
                let clamped_exp = steps.min(i32::MAX as u32) as i32;
                first_secs * factor.powi(clamped_exp)
            }
        };

        if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(unclamped_secs)
        }
    }
}

impl BackoffStrategy for BackoffPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);

        let jittered = match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            _ => self.jitter.apply(base),
        };

        let floor = self.floor.min(self.max);
        jittered.clamp(floor, self.max.max(floor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn exponential(first_ms: u64, max: Duration, jitter: JitterPolicy) -> BackoffPolicy {
        BackoffPolicy::exponential(Duration::from_millis(first_ms), 2.0, max).with_jitter(jitter)
    }

    #[test]
    fn test_first_attempt_returns_first() {
        let policy = exponential(100, Duration::from_secs(30), JitterPolicy::None);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
    }

    #[test]
    fn test_attempt_zero_is_treated_as_first() {
        let policy = exponential(100, Duration::from_secs(30), JitterPolicy::None);
        assert_eq!(policy.delay_for(0), policy.delay_for(1));
    }

    #[test]
    fn test_exponential_growth_no_jitter() {
        let policy = exponential(100, Duration::from_secs(30), JitterPolicy::None);

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.delay_for(5), Duration::from_millis(1600));
    }

    #[test]
    fn test_linear_growth() {
        let policy = BackoffPolicy::linear(
            Duration::from_millis(500),
            Duration::from_millis(250),
            Duration::from_secs(2),
        );
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(750));
        assert_eq!(policy.delay_for(3), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(50), Duration::from_secs(2));
    }

    #[test]
    fn test_constant_curve() {
        let policy = BackoffPolicy::constant(Duration::from_millis(500));
        for attempt in 0..10 {
            assert_eq!(
                policy.delay_for(attempt),
                Duration::from_millis(500),
                "attempt {} should be constant at 500ms",
                attempt
            );
        }
    }

    #[test]
    fn test_clamped_to_max() {
        let policy = exponential(100, Duration::from_secs(1), JitterPolicy::None);
        assert_eq!(policy.delay_for(11), Duration::from_secs(1));
    }

    #[test]
    fn test_first_exceeds_max() {
        let policy =
            BackoffPolicy::exponential(Duration::from_secs(10), 2.0, Duration::from_secs(5));
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
    }

    #[test]
    fn test_monotonic_without_jitter() {
        let policy = exponential(50, Duration::from_secs(20), JitterPolicy::None);
        let mut prev = Duration::ZERO;
        for attempt in 1..40 {
            let delay = policy.delay_for(attempt);
            assert!(delay >= prev, "attempt {attempt}: {delay:?} < {prev:?}");
            prev = delay;
        }
    }

    #[test]
    fn test_floor_bounds_full_jitter() {
        let policy = exponential(1000, Duration::from_secs(30), JitterPolicy::Full)
            .with_floor(Duration::from_millis(250));
        for attempt in 1..50 {
            let delay = policy.delay_for(attempt);
            assert!(delay >= Duration::from_millis(250), "below floor: {delay:?}");
            assert!(delay <= Duration::from_secs(30));
        }
    }

    #[test]
    fn test_full_jitter_never_exceeds_base() {
        let policy = exponential(100, Duration::from_secs(30), JitterPolicy::Full);

        for attempt in 5..15 {
            let base = policy.base_delay(attempt);
            let delay = policy.delay_for(attempt);
            assert!(
                delay <= base,
                "attempt {}: delay {:?} exceeds base {:?}",
                attempt,
                delay,
                base
            );
        }
    }

    #[test]
    fn test_equal_jitter_bounds() {
        let policy = BackoffPolicy::constant(Duration::from_millis(1000))
            .with_jitter(JitterPolicy::Equal);
        for attempt in 1..50 {
            let delay = policy.delay_for(attempt);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_decorrelated_jitter_grows_with_attempts() {
        let policy = exponential(100, Duration::from_secs(30), JitterPolicy::Decorrelated);

        let mut min_late = Duration::from_secs(999);
        let mut max_late = Duration::ZERO;
        for _ in 0..100 {
            let delay = policy.delay_for(9);
            min_late = min_late.min(delay);
            max_late = max_late.max(delay);
        }

        assert!(min_late >= Duration::from_millis(100), "min_late {min_late:?} below first");
        assert!(max_late >= Duration::from_secs(5), "max_late {max_late:?} range too narrow");
    }

    #[test]
    fn test_non_finite_overflow_clamps_to_max() {
        let policy = exponential(100, Duration::from_secs(10), JitterPolicy::None);
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_default_policy_is_bounded() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(100), Duration::from_secs(30));
    }
}
