//! Finite-arithmetic helpers shared by every estimator and controller.
//!
//! Every helper is total: NaN and infinities collapse to a neutral value
//! instead of propagating into EMA state.

/// Lower bound applied before taking a logarithm of a multiplier.
pub const MIN_LOG_ARGUMENT: f64 = 1e-4;

/// Lower bound on any EMA time constant.
const MIN_TAU_SECONDS: f64 = 0.01;

/// Returns true when `x` is finite and strictly positive.
#[inline]
#[must_use]
pub fn is_positive_finite(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

/// NaN/Infinity → 0, negatives → 0.
#[inline]
#[must_use]
pub fn sanitize_non_negative(x: f64) -> f64 {
    if x.is_finite() { x.max(0.0) } else { 0.0 }
}

/// Clamp into `[0, 1]`, mapping non-finite input to 0.
#[inline]
#[must_use]
pub fn clamp01(x: f64) -> f64 {
    if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 }
}

/// Smoothing factor for a time-based EMA: `alpha = 1 - exp(-dt / tau)`.
///
/// Degenerate `dt` yields `alpha = 1` (take the new value).
#[must_use]
pub fn ema_alpha(dt: f64, tau_seconds: f64) -> f64 {
    if !is_positive_finite(dt) {
        return 1.0;
    }
    let tau = if tau_seconds.is_finite() {
        tau_seconds.max(MIN_TAU_SECONDS)
    } else {
        MIN_TAU_SECONDS
    };
    let alpha = 1.0 - (-dt / tau).exp();
    if alpha.is_finite() {
        alpha.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// One EMA update. A non-finite observation leaves `prev` untouched; a
/// non-finite `prev` restarts from zero.
#[inline]
#[must_use]
pub fn ema(prev: f64, x: f64, alpha: f64) -> f64 {
    if !x.is_finite() {
        return prev;
    }
    let prev = if prev.is_finite() { prev } else { 0.0 };
    prev + (x - prev) * alpha.clamp(0.0, 1.0)
}

/// Monotone compression of a non-negative rate into `[0, 1]`:
/// `1 - exp(-x / target)`. A larger `target` makes the signal less sensitive.
#[must_use]
pub fn norm01(x: f64, target: f64) -> f64 {
    let x = sanitize_non_negative(x);
    if !is_positive_finite(target) {
        return if x > 0.0 { 1.0 } else { 0.0 };
    }
    clamp01(1.0 - (-x / target).exp())
}

/// `ln(1 + x)` with non-positive and non-finite input mapped to 0.
#[inline]
#[must_use]
pub fn safe_ln_1p(x: f64) -> f64 {
    if is_positive_finite(x) { x.ln_1p() } else { 0.0 }
}

/// Inverse of [`safe_ln_1p`] for non-negative compressed values.
#[inline]
#[must_use]
pub fn safe_exp_m1(x: f64) -> f64 {
    if is_positive_finite(x) {
        sanitize_non_negative(x.exp_m1())
    } else {
        0.0
    }
}

/// Natural log of a multiplier, guarded against `ln(0)`.
#[inline]
#[must_use]
pub fn ln_multiplier(m: f64) -> f64 {
    let m = if m.is_finite() { m } else { 1.0 };
    m.max(MIN_LOG_ARGUMENT).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_is_bounded_and_monotone_in_dt() {
        let a1 = ema_alpha(0.1, 7.5);
        let a2 = ema_alpha(1.0, 7.5);
        let a3 = ema_alpha(100.0, 7.5);
        assert!(a1 > 0.0 && a1 < a2 && a2 < a3 && a3 <= 1.0);
        assert_eq!(ema_alpha(f64::NAN, 7.5), 1.0);
        assert_eq!(ema_alpha(-1.0, 7.5), 1.0);
        assert!(ema_alpha(1.0, f64::INFINITY) > 0.0);
    }

    #[test]
    fn ema_ignores_non_finite_observation() {
        assert_eq!(ema(2.0, f64::NAN, 0.5), 2.0);
        assert_eq!(ema(2.0, f64::INFINITY, 0.5), 2.0);
        assert_eq!(ema(f64::NAN, 4.0, 0.5), 2.0);
        assert!((ema(0.0, 10.0, 0.25) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn norm01_is_monotone_and_bounded() {
        let mut prev = -1.0;
        for i in 0..200 {
            let v = norm01(f64::from(i) * 0.5, 8.0);
            assert!((0.0..=1.0).contains(&v));
            assert!(v >= prev);
            prev = v;
        }
        assert_eq!(norm01(f64::NAN, 8.0), 0.0);
        assert_eq!(norm01(-3.0, 8.0), 0.0);
        assert_eq!(norm01(f64::INFINITY, 8.0), 0.0);
        assert!(norm01(1.0, 10.0) < norm01(1.0, 1.0));
    }

    #[test]
    fn log_helpers_are_total() {
        assert_eq!(safe_ln_1p(-5.0), 0.0);
        assert_eq!(safe_ln_1p(f64::NAN), 0.0);
        assert!((safe_exp_m1(safe_ln_1p(42.0)) - 42.0).abs() < 1e-9);
        assert!(ln_multiplier(0.0).is_finite());
        assert_eq!(ln_multiplier(f64::NAN), 0.0);
    }

    #[test]
    fn clamp_helpers() {
        assert_eq!(clamp01(1.7), 1.0);
        assert_eq!(clamp01(-0.2), 0.0);
        assert_eq!(clamp01(f64::NAN), 0.0);
        assert_eq!(sanitize_non_negative(-1.0), 0.0);
        assert_eq!(sanitize_non_negative(f64::NEG_INFINITY), 0.0);
        assert_eq!(sanitize_non_negative(3.5), 3.5);
    }
}
