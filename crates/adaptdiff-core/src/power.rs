//! Virtual power estimate of the tracked player's build.
//!
//! Raw offense/defense/mobility are `log1p`-compressed so ordering is kept
//! while growth is bounded, combined into a weighted total, and EMA-smoothed
//! as one tuple. The first estimate after a reset is taken as-is.

use serde::{Deserialize, Serialize};

use crate::numeric::{ema, ema_alpha, safe_exp_m1, safe_ln_1p, sanitize_non_negative};
use crate::telemetry::DEFAULT_TAU_SECONDS;

pub const OFFENSE_WEIGHT: f64 = 0.50;
pub const DEFENSE_WEIGHT: f64 = 0.35;
pub const MOBILITY_WEIGHT: f64 = 0.15;

/// Effective-health credit per point of regeneration per second.
pub const REGEN_WEIGHT: f64 = 25.0;

const MIN_ARMOR_FACTOR: f64 = 0.05;
const MAX_ARMOR_FACTOR: f64 = 10.0;

/// Attribute snapshot read from the host for the tracked player.
///
/// `crit_chance` is a fraction (0.25 = 25 %).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerAttributes {
    pub max_health: f64,
    pub max_shield: f64,
    pub armor: f64,
    pub regen_per_second: f64,
    pub damage_per_hit: f64,
    pub attacks_per_second: f64,
    pub crit_chance: f64,
    pub move_speed: f64,
}

/// Uncompressed power components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RawPower {
    pub offense: f64,
    pub defense: f64,
    pub mobility: f64,
}

/// Compressed, smoothed power.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerSample {
    pub offense: f64,
    pub defense: f64,
    pub mobility: f64,
    pub total: f64,
}

impl PowerSample {
    /// Compress a raw estimate (no smoothing).
    #[must_use]
    pub fn from_raw(raw: RawPower) -> Self {
        let offense = safe_ln_1p(raw.offense);
        let defense = safe_ln_1p(raw.defense);
        let mobility = safe_ln_1p(raw.mobility);
        Self {
            offense,
            defense,
            mobility,
            total: OFFENSE_WEIGHT * offense + DEFENSE_WEIGHT * defense + MOBILITY_WEIGHT * mobility,
        }
    }

    /// Smoothed offense in raw units (damage per second).
    #[must_use]
    pub fn offense_raw(&self) -> f64 {
        safe_exp_m1(self.offense)
    }

    /// Smoothed defense in raw units (effective health).
    #[must_use]
    pub fn defense_raw(&self) -> f64 {
        safe_exp_m1(self.defense)
    }

    fn blend(self, next: Self, alpha: f64) -> Self {
        Self {
            offense: ema(self.offense, next.offense, alpha),
            defense: ema(self.defense, next.defense, alpha),
            mobility: ema(self.mobility, next.mobility, alpha),
            total: ema(self.total, next.total, alpha),
        }
    }
}

#[must_use]
pub fn compute_raw(attrs: &PowerAttributes) -> RawPower {
    let damage = sanitize_non_negative(attrs.damage_per_hit);
    let rate = sanitize_non_negative(attrs.attacks_per_second);
    let crit = sanitize_non_negative(attrs.crit_chance).min(1.0);
    let offense = sanitize_non_negative(damage * rate * (1.0 + crit));

    let pool = sanitize_non_negative(attrs.max_health) + sanitize_non_negative(attrs.max_shield);
    let armor = if attrs.armor.is_finite() { attrs.armor } else { 0.0 };
    let armor_factor = ((100.0 + armor) / 100.0).clamp(MIN_ARMOR_FACTOR, MAX_ARMOR_FACTOR);
    let regen = sanitize_non_negative(attrs.regen_per_second);
    let defense = sanitize_non_negative(pool * armor_factor + REGEN_WEIGHT * regen);

    RawPower {
        offense,
        defense,
        mobility: sanitize_non_negative(attrs.move_speed),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerEstimator {
    tau_seconds: f64,
    smoothed: Option<PowerSample>,
}

impl PowerEstimator {
    #[must_use]
    pub fn new(tau_seconds: f64) -> Self {
        Self {
            tau_seconds,
            smoothed: None,
        }
    }

    pub fn set_tau(&mut self, tau_seconds: f64) {
        self.tau_seconds = tau_seconds;
    }

    #[must_use]
    pub fn tau_seconds(&self) -> f64 {
        self.tau_seconds
    }

    #[must_use]
    pub fn compute_raw(&self, attrs: &PowerAttributes) -> RawPower {
        compute_raw(attrs)
    }

    /// Update with the current attributes. An invalid `dt` still returns the
    /// latest estimate but leaves the smoothed state untouched.
    pub fn compute_smoothed(&mut self, attrs: &PowerAttributes, dt: f64) -> PowerSample {
        let instant = PowerSample::from_raw(compute_raw(attrs));
        let next = match self.smoothed {
            None => instant,
            Some(prev) => {
                if !(dt.is_finite() && dt > 0.0) {
                    return prev;
                }
                prev.blend(instant, ema_alpha(dt, self.tau_seconds))
            }
        };
        self.smoothed = Some(next);
        next
    }

    #[must_use]
    pub fn latest(&self) -> Option<PowerSample> {
        self.smoothed
    }

    pub fn reset(&mut self) {
        self.smoothed = None;
    }
}

impl Default for PowerEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_TAU_SECONDS)
    }
}
