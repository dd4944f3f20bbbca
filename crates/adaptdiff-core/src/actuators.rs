//! Actuator state: the single source of truth for each axis multiplier.
//!
//! Every write goes through one clamped setter, so a stored value is always
//! finite and inside the configured `[floor, cap]`. Application to the host
//! world is a separate, idempotent pass over live opponents.

use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::config::GeneLimits;
use crate::events::EntityId;

/// Neutral multiplier (no difficulty change).
pub const NEUTRAL_MULTIPLIER: f64 = 1.0;

/// Host-side surface the core drives.
///
/// `apply_multiplier` must be idempotent: re-applying the value an entity
/// already carries has no further effect.
pub trait HostWorld {
    /// Opposing entities currently alive.
    fn live_opponents(&self) -> Vec<EntityId>;

    /// Set `entity`'s multiplier on `axis` to `value`.
    fn apply_multiplier(&mut self, entity: EntityId, axis: Axis, value: f64);
}

/// Result of one setter call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorWrite {
    pub previous: f64,
    pub stored: f64,
}

impl ActuatorWrite {
    /// True when the stored value moved by more than `epsilon`.
    #[must_use]
    pub fn changed(&self, epsilon: f64) -> bool {
        (self.stored - self.previous).abs() > epsilon
    }
}

/// Current multiplier per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActuatorState {
    limits: GeneLimits,
    values: [f64; Axis::COUNT],
}

impl ActuatorState {
    #[must_use]
    pub fn new(limits: GeneLimits) -> Self {
        let limits = limits.sanitized();
        Self {
            limits,
            values: [limits.clamp(NEUTRAL_MULTIPLIER); Axis::COUNT],
        }
    }

    #[must_use]
    pub fn limits(&self) -> GeneLimits {
        self.limits
    }

    /// Replace the range and re-clamp every stored value into it.
    pub fn set_limits(&mut self, limits: GeneLimits) {
        self.limits = limits.sanitized();
        for v in &mut self.values {
            *v = self.limits.clamp(*v);
        }
    }

    /// Store `value` for `axis`, clamped to the range. Non-finite input is a
    /// no-op and returns `None`.
    pub fn set(&mut self, axis: Axis, value: f64) -> Option<ActuatorWrite> {
        if !value.is_finite() {
            return None;
        }
        let previous = self.get(axis);
        let stored = self.limits.clamp(value);
        self.values[axis.index()] = stored;
        Some(ActuatorWrite { previous, stored })
    }

    /// Always finite and inside `[floor, cap]`.
    #[must_use]
    pub fn get(&self, axis: Axis) -> f64 {
        let v = self.values[axis.index()];
        if v.is_finite() {
            self.limits.clamp(v)
        } else {
            self.limits.clamp(NEUTRAL_MULTIPLIER)
        }
    }

    /// Every multiplier in axis order.
    #[must_use]
    pub fn all(&self) -> [f64; Axis::COUNT] {
        Axis::ALL.map(|axis| self.get(axis))
    }

    /// Every axis back to neutral (clamped, in case 1.0 lies outside the range).
    pub fn reset(&mut self) {
        let neutral = self.limits.clamp(NEUTRAL_MULTIPLIER);
        self.values = [neutral; Axis::COUNT];
    }

    #[must_use]
    pub fn is_neutral(&self) -> bool {
        let neutral = self.limits.clamp(NEUTRAL_MULTIPLIER);
        self.all().iter().all(|v| (*v - neutral).abs() < f64::EPSILON)
    }

    /// Apply every axis to every live opponent. Returns the entity count.
    pub fn apply_to_all<W: HostWorld + ?Sized>(&self, world: &mut W) -> usize {
        let opponents = world.live_opponents();
        for &entity in &opponents {
            self.apply_to_entity(world, entity);
        }
        opponents.len()
    }

    /// Apply every axis to one entity (e.g. a fresh spawn).
    pub fn apply_to_entity<W: HostWorld + ?Sized>(&self, world: &mut W, entity: EntityId) {
        for axis in Axis::ALL {
            world.apply_multiplier(entity, axis, self.get(axis));
        }
    }
}

impl Default for ActuatorState {
    fn default() -> Self {
        Self::new(GeneLimits::default())
    }
}
