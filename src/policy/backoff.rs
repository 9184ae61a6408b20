use rand::Rng;
use std::time::Duration;

/// Maximum relative deviation applied by [`jitter`]
pub const JITTER_SPREAD: f64 = 0.5;

/// `base × 2^attempt`, saturating instead of overflowing
///
/// # Examples
///
/// ```
/// use shelfwatch::policy::exponential;
/// use std::time::Duration;
///
/// assert_eq!(exponential(Duration::from_secs(60), 0), Duration::from_secs(60));
/// assert_eq!(exponential(Duration::from_secs(60), 2), Duration::from_secs(240));
/// ```
pub fn exponential(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

/// Scales `delay` by `1 + factor`, with `factor` clamped to ±[`JITTER_SPREAD`]
pub fn jitter(delay: Duration, factor: f64) -> Duration {
    let factor = if factor.is_finite() {
        factor.clamp(-JITTER_SPREAD, JITTER_SPREAD)
    } else {
        0.0
    };
    delay.mul_f64(1.0 + factor)
}

/// [`jitter`] with a factor drawn uniformly from the supplied RNG
pub fn jitter_with<R: Rng + ?Sized>(delay: Duration, rng: &mut R) -> Duration {
    jitter(delay, rng.random_range(-JITTER_SPREAD..=JITTER_SPREAD))
}

/// Randomized delay `base × (1 + u)` for a draw `u` in [0, 1)
///
/// Spreads out concurrent writers retrying the shared dataset.
pub fn spread(base: Duration, u: f64) -> Duration {
    let u = if u.is_finite() { u.clamp(0.0, 1.0) } else { 0.0 };
    base.mul_f64(1.0 + u)
}

/// Uniform pause in `[min, max]`, used for human-like pacing
pub fn uniform_between<R: Rng + ?Sized>(min: Duration, max: Duration, rng: &mut R) -> Duration {
    if max <= min {
        return min;
    }
    let millis = rng.random_range(min.as_millis()..=max.as_millis());
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}
