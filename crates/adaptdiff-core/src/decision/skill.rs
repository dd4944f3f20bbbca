//! Per-axis skill estimation: a fixed convex combination of normalized
//! sensor signals.
//!
//! Each signal is oriented so that `1.0` means "the player handles this well".
//! Weights are policy and are configurable per axis; the estimate divides by
//! the weight sum, so any non-negative weighting yields a value in `[0, 1]`.

use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::numeric::clamp01;
use crate::telemetry::{MIN_OBSERVED_DEFEAT_SECONDS, SensorSample};

/// Skill estimate used when no weight is positive.
pub const NEUTRAL_SKILL: f64 = 0.5;

/// Oriented skill signals derived from a [`SensorSample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillSignal {
    /// Outgoing damage relative to the build's expected output.
    OutgoingDamage,
    /// Fast kills. Neutral until a time-to-defeat has been observed.
    KillSpeed,
    /// `1 - hit_rate_norm01`.
    Evasion,
    /// `1 - incoming_damage_norm01`.
    Survivability,
    /// `1 - low_resource_uptime`.
    Safety,
    /// `1 - deaths_norm01`.
    DeathAvoidance,
}

impl SkillSignal {
    pub const ALL: [SkillSignal; 6] = [
        SkillSignal::OutgoingDamage,
        SkillSignal::KillSpeed,
        SkillSignal::Evasion,
        SkillSignal::Survivability,
        SkillSignal::Safety,
        SkillSignal::DeathAvoidance,
    ];

    #[must_use]
    pub fn value(self, sample: &SensorSample) -> f64 {
        let v = match self {
            Self::OutgoingDamage => sample.outgoing_damage_norm01,
            Self::KillSpeed => {
                if sample.avg_time_to_defeat_seconds > MIN_OBSERVED_DEFEAT_SECONDS {
                    1.0 - sample.avg_time_to_defeat_norm01
                } else {
                    NEUTRAL_SKILL
                }
            }
            Self::Evasion => 1.0 - sample.hit_rate_norm01,
            Self::Survivability => 1.0 - sample.incoming_damage_norm01,
            Self::Safety => 1.0 - sample.low_resource_uptime,
            Self::DeathAvoidance => 1.0 - sample.deaths_norm01,
        };
        clamp01(v)
    }
}

/// Weights for one axis. Negative and non-finite weights count as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillWeights {
    pub outgoing_damage: f64,
    pub kill_speed: f64,
    pub evasion: f64,
    pub survivability: f64,
    pub safety: f64,
    pub death_avoidance: f64,
}

impl SkillWeights {
    #[must_use]
    pub fn weight(&self, signal: SkillSignal) -> f64 {
        let w = match signal {
            SkillSignal::OutgoingDamage => self.outgoing_damage,
            SkillSignal::KillSpeed => self.kill_speed,
            SkillSignal::Evasion => self.evasion,
            SkillSignal::Survivability => self.survivability,
            SkillSignal::Safety => self.safety,
            SkillSignal::DeathAvoidance => self.death_avoidance,
        };
        if w.is_finite() { w.max(0.0) } else { 0.0 }
    }

    #[must_use]
    pub fn total_weight(&self) -> f64 {
        SkillSignal::ALL.iter().map(|s| self.weight(*s)).sum()
    }

    /// Weighted skill estimate in `[0, 1]`.
    #[must_use]
    pub fn estimate(&self, sample: &SensorSample) -> f64 {
        let total = self.total_weight();
        if !(total.is_finite() && total > 0.0) {
            return NEUTRAL_SKILL;
        }
        let weighted: f64 = SkillSignal::ALL
            .iter()
            .map(|s| self.weight(*s) * s.value(sample))
            .sum();
        clamp01(weighted / total)
    }

    /// Health axis: kill efficiency dominates.
    #[must_use]
    pub const fn max_health() -> Self {
        Self {
            outgoing_damage: 0.45,
            kill_speed: 0.45,
            evasion: 0.0,
            survivability: 0.0,
            safety: 0.10,
            death_avoidance: 0.0,
        }
    }

    #[must_use]
    pub const fn move_speed() -> Self {
        Self {
            outgoing_damage: 0.20,
            kill_speed: 0.0,
            evasion: 0.45,
            survivability: 0.25,
            safety: 0.10,
            death_avoidance: 0.0,
        }
    }

    #[must_use]
    pub const fn attack_speed() -> Self {
        Self {
            outgoing_damage: 0.0,
            kill_speed: 0.0,
            evasion: 0.40,
            survivability: 0.35,
            safety: 0.20,
            death_avoidance: 0.05,
        }
    }

    #[must_use]
    pub const fn attack_damage() -> Self {
        Self {
            outgoing_damage: 0.0,
            kill_speed: 0.0,
            evasion: 0.05,
            survivability: 0.45,
            safety: 0.30,
            death_avoidance: 0.20,
        }
    }

    #[must_use]
    pub const fn for_axis(axis: Axis) -> Self {
        match axis {
            Axis::MaxHealth => Self::max_health(),
            Axis::MoveSpeed => Self::move_speed(),
            Axis::AttackSpeed => Self::attack_speed(),
            Axis::AttackDamage => Self::attack_damage(),
        }
    }
}

/// Skill weights for every axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillModel {
    pub max_health: SkillWeights,
    pub move_speed: SkillWeights,
    pub attack_speed: SkillWeights,
    pub attack_damage: SkillWeights,
}

impl SkillModel {
    #[must_use]
    pub fn get(&self, axis: Axis) -> &SkillWeights {
        match axis {
            Axis::MaxHealth => &self.max_health,
            Axis::MoveSpeed => &self.move_speed,
            Axis::AttackSpeed => &self.attack_speed,
            Axis::AttackDamage => &self.attack_damage,
        }
    }

    pub fn set(&mut self, axis: Axis, weights: SkillWeights) {
        match axis {
            Axis::MaxHealth => self.max_health = weights,
            Axis::MoveSpeed => self.move_speed = weights,
            Axis::AttackSpeed => self.attack_speed = weights,
            Axis::AttackDamage => self.attack_damage = weights,
        }
    }

    /// Skill estimate for every axis, in axis order.
    #[must_use]
    pub fn estimate_all(&self, sample: &SensorSample) -> [f64; Axis::COUNT] {
        Axis::ALL.map(|axis| self.get(axis).estimate(sample))
    }
}

impl Default for SkillModel {
    fn default() -> Self {
        Self {
            max_health: SkillWeights::max_health(),
            move_speed: SkillWeights::move_speed(),
            attack_speed: SkillWeights::attack_speed(),
            attack_damage: SkillWeights::attack_damage(),
        }
    }
}
