//! Telemetry sampler: combat events and per-tick state → bounded sensor signals.
//!
//! Signals tracked for the single representative player:
//! - `incoming_damage_rate`: EMA of damage received per second
//! - `outgoing_damage_rate`: EMA of damage dealt per second
//! - `hit_rate_on_target`: EMA of hits landed on the player per second
//! - `engaged_uptime`: EMA of the in-combat flag
//! - `low_resource_uptime`: EMA of "health below threshold"
//! - `deaths_per_window`: player deaths within the trailing window
//! - `avg_time_to_defeat_seconds`: EMA of the mean first-hit → defeat duration
//!
//! EMAs use a time-based smoothing factor `alpha = 1 - exp(-dt / tau)`, so
//! irregular event spacing is weighted consistently. Every mutating entry
//! point validates its numeric input and drops invalid calls without touching
//! state; the sampler never panics and never stores a non-finite value.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::events::EntityId;
use crate::numeric::{
    clamp01, ema, ema_alpha, is_positive_finite, norm01, safe_exp_m1, sanitize_non_negative,
};
use crate::power::PowerSample;

pub const DEFAULT_TAU_SECONDS: f64 = 7.5;
pub const DEFAULT_WINDOW_SECONDS: f64 = 60.0;
pub const DEFAULT_LOW_HEALTH_THRESHOLD: f64 = 0.30;

const MIN_TAU_SECONDS: f64 = 0.1;
const MIN_WINDOW_SECONDS: f64 = 5.0;

/// Capacity of the time-to-defeat ring buffer.
pub const MAX_DEFEAT_SAMPLES: usize = 64;
/// Upper clamp for one time-to-defeat sample.
pub const MAX_DEFEAT_SECONDS: f64 = 600.0;
/// Upper bound on concurrently tracked first-hit entries.
pub const MAX_TRACKED_TARGETS: usize = 1024;
/// A tracked time-to-defeat below this is treated as "not yet observed".
pub const MIN_OBSERVED_DEFEAT_SECONDS: f64 = 0.01;

/// Smoothing and windowing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub tau_seconds: f64,
    pub window_seconds: f64,
    pub low_health_threshold: f64,
}

impl SensorConfig {
    #[must_use]
    pub fn sanitized(self) -> Self {
        let tau_seconds = if self.tau_seconds.is_finite() {
            self.tau_seconds.max(MIN_TAU_SECONDS)
        } else {
            DEFAULT_TAU_SECONDS
        };
        let window_seconds = if self.window_seconds.is_finite() {
            self.window_seconds.max(MIN_WINDOW_SECONDS)
        } else {
            DEFAULT_WINDOW_SECONDS
        };
        Self {
            tau_seconds,
            window_seconds,
            low_health_threshold: clamp01(self.low_health_threshold),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            tau_seconds: DEFAULT_TAU_SECONDS,
            window_seconds: DEFAULT_WINDOW_SECONDS,
            low_health_threshold: DEFAULT_LOW_HEALTH_THRESHOLD,
        }
    }
}

/// Targets used to compress raw rates into `[0, 1]` via `1 - exp(-x / target)`.
///
/// A higher target makes the normalized signal less sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormTargets {
    /// Survival horizon: incoming DPS is normalized against `defense / time_to_die`.
    pub time_to_die_seconds: f64,
    /// Target time from first hit to defeat.
    pub time_to_defeat_seconds: f64,
    /// Hits per second on the player.
    pub hits_per_second: f64,
    /// Deaths per trailing window.
    pub deaths_per_window: f64,
    /// Incoming DPS scale used when no power sample is available.
    pub incoming_damage_per_second: f64,
    /// Outgoing DPS scale used when no power sample is available.
    pub outgoing_damage_per_second: f64,
}

impl NormTargets {
    #[must_use]
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        let pick = |v: f64, fallback: f64| if is_positive_finite(v) { v } else { fallback };
        Self {
            time_to_die_seconds: pick(self.time_to_die_seconds, d.time_to_die_seconds),
            time_to_defeat_seconds: pick(self.time_to_defeat_seconds, d.time_to_defeat_seconds),
            hits_per_second: pick(self.hits_per_second, d.hits_per_second),
            deaths_per_window: pick(self.deaths_per_window, d.deaths_per_window),
            incoming_damage_per_second: pick(
                self.incoming_damage_per_second,
                d.incoming_damage_per_second,
            ),
            outgoing_damage_per_second: pick(
                self.outgoing_damage_per_second,
                d.outgoing_damage_per_second,
            ),
        }
    }

    /// Incoming-DPS target, scaled by the player's defensive power when known.
    #[must_use]
    pub fn incoming_target(&self, power: Option<&PowerSample>) -> f64 {
        let defense_raw = power.map_or(0.0, |p| safe_exp_m1(p.defense));
        if is_positive_finite(defense_raw) && is_positive_finite(self.time_to_die_seconds) {
            defense_raw / self.time_to_die_seconds
        } else {
            self.incoming_damage_per_second
        }
    }

    /// Outgoing-DPS target: the build's theoretical DPS when known.
    #[must_use]
    pub fn outgoing_target(&self, power: Option<&PowerSample>) -> f64 {
        let offense_raw = power.map_or(0.0, |p| safe_exp_m1(p.offense));
        if is_positive_finite(offense_raw) {
            offense_raw
        } else {
            self.outgoing_damage_per_second
        }
    }
}

impl Default for NormTargets {
    fn default() -> Self {
        Self {
            time_to_die_seconds: 10.0,
            time_to_defeat_seconds: 8.0,
            hits_per_second: 1.5,
            deaths_per_window: 2.0,
            incoming_damage_per_second: 60.0,
            outgoing_damage_per_second: 120.0,
        }
    }
}

/// Latest sensor readings. Raw fields are `>= 0`; every `*_norm01` field and
/// both uptimes are in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub incoming_damage_rate: f64,
    pub incoming_damage_norm01: f64,
    pub outgoing_damage_rate: f64,
    pub outgoing_damage_norm01: f64,
    pub hit_rate_on_target: f64,
    pub hit_rate_norm01: f64,
    pub engaged_uptime: f64,
    pub low_resource_uptime: f64,
    pub deaths_per_window: f64,
    pub deaths_norm01: f64,
    pub avg_time_to_defeat_seconds: f64,
    pub avg_time_to_defeat_norm01: f64,
}

impl SensorSample {
    /// All normalized fields, in declaration order.
    #[must_use]
    pub fn normalized_fields(&self) -> [f64; 7] {
        [
            self.incoming_damage_norm01,
            self.outgoing_damage_norm01,
            self.hit_rate_norm01,
            self.engaged_uptime,
            self.low_resource_uptime,
            self.deaths_norm01,
            self.avg_time_to_defeat_norm01,
        ]
    }

    /// All raw fields, in declaration order.
    #[must_use]
    pub fn raw_fields(&self) -> [f64; 5] {
        [
            self.incoming_damage_rate,
            self.outgoing_damage_rate,
            self.hit_rate_on_target,
            self.deaths_per_window,
            self.avg_time_to_defeat_seconds,
        ]
    }

    /// True when the sample satisfies every bound invariant.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.normalized_fields()
            .iter()
            .all(|v| v.is_finite() && (0.0..=1.0).contains(v))
            && self.raw_fields().iter().all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// EMA-based telemetry estimator for one tracked player.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySampler {
    config: SensorConfig,
    targets: NormTargets,
    /// Sampler-local clock, advanced by accepted `tick_state` calls.
    clock_seconds: f64,
    incoming_rate_ema: f64,
    outgoing_rate_ema: f64,
    hit_rate_ema: f64,
    engaged_ema: f64,
    low_health_ema: f64,
    defeat_seconds_ema: f64,
    death_times: VecDeque<f64>,
    first_hit_times: HashMap<EntityId, f64>,
    defeat_samples: VecDeque<f64>,
}

impl TelemetrySampler {
    #[must_use]
    pub fn new(config: SensorConfig, targets: NormTargets) -> Self {
        Self {
            config: config.sanitized(),
            targets: targets.sanitized(),
            clock_seconds: 0.0,
            incoming_rate_ema: 0.0,
            outgoing_rate_ema: 0.0,
            hit_rate_ema: 0.0,
            engaged_ema: 0.0,
            low_health_ema: 0.0,
            defeat_seconds_ema: 0.0,
            death_times: VecDeque::with_capacity(8),
            first_hit_times: HashMap::with_capacity(128),
            defeat_samples: VecDeque::with_capacity(MAX_DEFEAT_SAMPLES),
        }
    }

    #[must_use]
    pub fn config(&self) -> SensorConfig {
        self.config
    }

    #[must_use]
    pub fn targets(&self) -> NormTargets {
        self.targets
    }

    /// Replace smoothing parameters and normalization targets in place.
    pub fn reconfigure(&mut self, config: SensorConfig, targets: NormTargets) {
        self.config = config.sanitized();
        self.targets = targets.sanitized();
    }

    /// Clear all accumulated state. Configuration is kept.
    pub fn reset(&mut self) {
        self.clock_seconds = 0.0;
        self.incoming_rate_ema = 0.0;
        self.outgoing_rate_ema = 0.0;
        self.hit_rate_ema = 0.0;
        self.engaged_ema = 0.0;
        self.low_health_ema = 0.0;
        self.defeat_seconds_ema = 0.0;
        self.death_times.clear();
        self.first_hit_times.clear();
        self.defeat_samples.clear();
    }

    #[must_use]
    pub fn clock_seconds(&self) -> f64 {
        self.clock_seconds
    }

    /// Number of opponents hit but not yet defeated.
    #[must_use]
    pub fn tracked_targets(&self) -> usize {
        self.first_hit_times.len()
    }

    #[must_use]
    pub fn defeat_sample_count(&self) -> usize {
        self.defeat_samples.len()
    }

    /// Advance the clock and update the state-driven EMAs.
    ///
    /// Returns `false` (and changes nothing) for invalid `dt` or a non-finite
    /// health fraction.
    pub fn tick_state(&mut self, engaged: bool, health_fraction: f64, dt: f64) -> bool {
        if !is_positive_finite(dt) || !health_fraction.is_finite() {
            return false;
        }
        self.clock_seconds += dt;
        let alpha = ema_alpha(dt, self.config.tau_seconds);

        let engaged_signal = if engaged { 1.0 } else { 0.0 };
        self.engaged_ema = ema(self.engaged_ema, engaged_signal, alpha);

        let hp = health_fraction.clamp(0.0, 1.0);
        let low_signal = if hp > 0.0 && hp < self.config.low_health_threshold {
            1.0
        } else {
            0.0
        };
        self.low_health_ema = ema(self.low_health_ema, low_signal, alpha);

        let window_avg = self.mean_defeat_seconds();
        self.defeat_seconds_ema = ema(self.defeat_seconds_ema, window_avg, alpha);

        self.prune_stale_first_hits();
        true
    }

    /// Record damage received by the tracked player (one hit).
    pub fn observe_incoming_damage(&mut self, amount: f64, dt: f64) -> bool {
        if !is_positive_finite(amount) || !is_positive_finite(dt) {
            return false;
        }
        let rate = amount / dt;
        let hits = 1.0 / dt;
        if !rate.is_finite() || !hits.is_finite() {
            return false;
        }
        let alpha = ema_alpha(dt, self.config.tau_seconds);
        self.incoming_rate_ema = ema(self.incoming_rate_ema, rate, alpha);
        self.hit_rate_ema = ema(self.hit_rate_ema, hits, alpha);
        true
    }

    /// Record damage dealt by the tracked player to an opponent.
    pub fn observe_outgoing_damage(&mut self, amount: f64, dt: f64, target: EntityId) -> bool {
        if !is_positive_finite(amount) || !is_positive_finite(dt) {
            return false;
        }
        let rate = amount / dt;
        if !rate.is_finite() {
            return false;
        }
        let alpha = ema_alpha(dt, self.config.tau_seconds);
        self.outgoing_rate_ema = ema(self.outgoing_rate_ema, rate, alpha);

        if !self.first_hit_times.contains_key(&target) {
            if self.first_hit_times.len() >= MAX_TRACKED_TARGETS {
                self.evict_oldest_first_hit();
            }
            self.first_hit_times.insert(target, self.clock_seconds);
        }
        true
    }

    /// Record an opponent defeat. Returns `true` when a duration sample was
    /// produced; untracked targets (never hit by the player) are ignored.
    pub fn observe_target_defeated(&mut self, target: EntityId) -> bool {
        let Some(first_hit) = self.first_hit_times.remove(&target) else {
            return false;
        };
        let duration = self.clock_seconds - first_hit;
        if !duration.is_finite() {
            return false;
        }
        self.defeat_samples
            .push_back(duration.clamp(0.0, MAX_DEFEAT_SECONDS));
        while self.defeat_samples.len() > MAX_DEFEAT_SAMPLES {
            self.defeat_samples.pop_front();
        }
        true
    }

    /// Record a death of the tracked player at the current sampler time.
    pub fn observe_self_defeated(&mut self) {
        self.death_times.push_back(self.clock_seconds);
        self.prune_deaths();
    }

    /// Deaths inside the trailing window (prunes expired entries).
    pub fn deaths_in_window(&mut self) -> usize {
        self.prune_deaths();
        self.death_times.len()
    }

    /// Produce the current sample. `power` scales the damage normalizers.
    pub fn sample(&mut self, power: Option<&PowerSample>) -> SensorSample {
        let deaths = self.deaths_in_window() as f64;
        let targets = self.targets;

        let incoming = sanitize_non_negative(self.incoming_rate_ema);
        let outgoing = sanitize_non_negative(self.outgoing_rate_ema);
        let hit_rate = sanitize_non_negative(self.hit_rate_ema);
        let defeat_seconds = sanitize_non_negative(self.defeat_seconds_ema);

        SensorSample {
            incoming_damage_rate: incoming,
            incoming_damage_norm01: norm01(incoming, targets.incoming_target(power)),
            outgoing_damage_rate: outgoing,
            outgoing_damage_norm01: norm01(outgoing, targets.outgoing_target(power)),
            hit_rate_on_target: hit_rate,
            hit_rate_norm01: norm01(hit_rate, targets.hits_per_second),
            engaged_uptime: clamp01(self.engaged_ema),
            low_resource_uptime: clamp01(self.low_health_ema),
            deaths_per_window: deaths,
            deaths_norm01: norm01(deaths, targets.deaths_per_window),
            avg_time_to_defeat_seconds: defeat_seconds,
            avg_time_to_defeat_norm01: norm01(defeat_seconds, targets.time_to_defeat_seconds),
        }
    }

    fn mean_defeat_seconds(&self) -> f64 {
        if self.defeat_samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.defeat_samples.iter().sum();
        sanitize_non_negative(sum / self.defeat_samples.len() as f64)
    }

    fn prune_deaths(&mut self) {
        let cutoff = self.clock_seconds - self.config.window_seconds;
        while self.death_times.front().is_some_and(|&t| t < cutoff) {
            self.death_times.pop_front();
        }
    }

    fn prune_stale_first_hits(&mut self) {
        let cutoff = self.clock_seconds - MAX_DEFEAT_SECONDS;
        self.first_hit_times.retain(|_, t| *t >= cutoff);
    }

    fn evict_oldest_first_hit(&mut self) {
        let oldest = self
            .first_hit_times
            .iter()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(core::cmp::Ordering::Equal))
            .map(|(id, _)| *id);
        if let Some(id) = oldest {
            self.first_hit_times.remove(&id);
        }
    }
}

impl Default for TelemetrySampler {
    fn default() -> Self {
        Self::new(SensorConfig::default(), NormTargets::default())
    }
}
