//! # Jitter for reconnect delays.
//!
//! Many clients losing the same server at the same moment will all reconnect on the
//! same schedule unless their delays are spread out. [`JitterPolicy`] randomizes the
//! base delay computed by [`BackoffPolicy`](crate::BackoffPolicy):
//!
//! - [`JitterPolicy::None`] exact delays
//! - [`JitterPolicy::Full`] `random[0, base]`
//! - [`JitterPolicy::Equal`] `base/2 + random[0, base/2]`
//! - [`JitterPolicy::Decorrelated`] `random[first, base × 3]`, capped at max

use std::time::Duration;

use rand::Rng;

/// Randomization applied on top of the base reconnect delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Exact base delay. Predictable; use for a single client or in tests.
    #[default]
    None,

    /// Uniform in `[0, base]`. Spreads load the most, can cut the delay to nothing
    /// (pair it with [`BackoffPolicy::floor`](crate::BackoffPolicy::floor)).
    Full,

    /// `base/2 + uniform[0, base/2]`. Keeps at least half of the base delay.
    Equal,

    /// Uniform in `[first, base × 3]`, capped at max.
    /// Needs extra context, see [`apply_decorrelated`](Self::apply_decorrelated).
    Decorrelated,
}

impl JitterPolicy {
    /// Applies jitter to `delay`.
    ///
    /// `Decorrelated` returns `delay` unchanged here; it needs
    /// [`apply_decorrelated`](Self::apply_decorrelated).
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None | JitterPolicy::Decorrelated => delay,
            JitterPolicy::Full => between_ms(&mut rand::rng(), 0, millis(delay)),
            JitterPolicy::Equal => {
                let half = millis(delay) / 2;
                let extra = between_ms(&mut rand::rng(), 0, half);
                Duration::from_millis(half) + extra
            }
        }
    }

    /// Applies decorrelated jitter using the policy floor `base`, the current base delay
    /// `prev` and the cap `max`.
    ///
    /// Falls back to [`apply`](Self::apply) on `prev` for every other variant.
    pub fn apply_decorrelated(&self, base: Duration, prev: Duration, max: Duration) -> Duration {
        if !matches!(self, JitterPolicy::Decorrelated) {
            return self.apply(prev);
        }

        let low = millis(base);
        let high = millis(prev).saturating_mul(3).min(millis(max)).max(low);
        if low >= high {
            return base;
        }
        between_ms(&mut rand::rng(), low, high)
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}

fn between_ms<R: Rng>(rng: &mut R, low: u64, high: u64) -> Duration {
    if high <= low {
        return Duration::from_millis(low);
    }
    Duration::from_millis(rng.random_range(low..=high))
}
