//! Fixed-interval step accumulator for the decision loop.
//!
//! Frames arrive with arbitrary `dt`; controllers step on a fixed cadence.
//! The clock accrues frame time and hands out whole steps, carrying the
//! remainder so no time is lost or double-counted.

pub const DEFAULT_STEP_SECONDS: f64 = 10.0;
pub const MIN_STEP_SECONDS: f64 = 1.0;
pub const MAX_STEP_SECONDS: f64 = 300.0;

/// Ceiling on accrued time; protects against a huge stall producing an
/// unbounded burst of steps.
pub const MAX_ACCUMULATED_SECONDS: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepClock {
    interval_seconds: f64,
    accumulated_seconds: f64,
}

impl StepClock {
    #[must_use]
    pub fn new(interval_seconds: f64) -> Self {
        Self {
            interval_seconds: clamp_interval(interval_seconds),
            accumulated_seconds: 0.0,
        }
    }

    #[must_use]
    pub fn interval_seconds(&self) -> f64 {
        self.interval_seconds
    }

    #[must_use]
    pub fn accumulated_seconds(&self) -> f64 {
        self.accumulated_seconds
    }

    /// Change the cadence. The carry is clamped into the new interval.
    pub fn set_interval(&mut self, interval_seconds: f64) {
        self.interval_seconds = clamp_interval(interval_seconds);
        self.accumulated_seconds = self
            .accumulated_seconds
            .clamp(0.0, self.interval_seconds);
    }

    /// Add frame time. Invalid `dt` is ignored.
    pub fn accrue(&mut self, dt: f64) -> bool {
        if !dt.is_finite() || dt <= 0.0 {
            return false;
        }
        self.accumulated_seconds = (self.accumulated_seconds + dt).min(MAX_ACCUMULATED_SECONDS);
        true
    }

    /// Number of whole steps now due. The remainder stays accrued.
    pub fn consume_due(&mut self) -> u32 {
        let interval = self.interval_seconds;
        if self.accumulated_seconds < interval {
            return 0;
        }
        let due = (self.accumulated_seconds / interval).floor();
        let carry = self.accumulated_seconds - due * interval;
        self.accumulated_seconds = if carry.is_finite() {
            carry.clamp(0.0, interval)
        } else {
            0.0
        };
        // `due` is at most MAX_ACCUMULATED_SECONDS / MIN_STEP_SECONDS.
        due as u32
    }

    /// Accrue `dt` and return the steps due in one call.
    pub fn advance(&mut self, dt: f64) -> u32 {
        self.accrue(dt);
        self.consume_due()
    }

    #[must_use]
    pub fn seconds_until_next(&self) -> f64 {
        (self.interval_seconds - self.accumulated_seconds).max(0.0)
    }

    pub fn reset(&mut self) {
        self.accumulated_seconds = 0.0;
    }
}

impl Default for StepClock {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_SECONDS)
    }
}

fn clamp_interval(seconds: f64) -> f64 {
    if seconds.is_finite() {
        seconds.clamp(MIN_STEP_SECONDS, MAX_STEP_SECONDS)
    } else {
        DEFAULT_STEP_SECONDS
    }
}
