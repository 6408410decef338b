//! Arrival regularity test.
//!
//! Scores an inter-arrival delta against the null hypothesis that a
//! well-behaved sender emits a Poisson process of rate `1 / expected_interval`.
//! Inter-arrival times of such a process are exponentially distributed with
//! CDF `F(t) = 1 - exp(-t / expected_interval)`; the score is the two-tailed
//! probability `2 * min(F(delta), 1 - F(delta))`.
//!
//! Both tails are penalised: a flood (delta near zero) and an implausibly
//! silent sender (delta far above the mean) both yield `p -> 0`.

/// Two-tailed p-value of `delta` under an exponential inter-arrival model.
///
/// `expected_interval` must be positive; that is enforced by
/// [`PolicyConfig::validate`](crate::PolicyConfig::validate), not here.
#[must_use]
pub fn p_value(delta: f64, expected_interval: f64) -> f64 {
    let fast = 1.0 - (-delta / expected_interval).exp();
    let slow = 1.0 - fast;
    (2.0 * fast.min(slow)).clamp(0.0, 1.0)
}

/// Whether `p` passes a test at `threshold` (strictly greater).
#[must_use]
pub fn passes(p: f64, threshold: f64) -> bool {
    p > threshold
}
