//! Atomic counters for director observability.
//!
//! All counters use relaxed ordering; they are diagnostic, not
//! synchronization primitives. Each orchestrator owns its own instance.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug)]
pub struct DirectorMetrics {
    /// Frames processed while the player was tracked.
    pub frames: AtomicU64,
    /// Decision steps executed (all enabled axes stepped once).
    pub decision_steps: AtomicU64,
    /// Steps skipped because nothing was eligible to step.
    pub skipped_steps: AtomicU64,
    /// Batched world applications.
    pub applications: AtomicU64,
    /// Entities updated across all applications.
    pub entities_updated: AtomicU64,
    /// External overrides detected by axis controllers.
    pub resyncs: AtomicU64,
    /// Inputs discarded by sanitization.
    pub dropped_inputs: AtomicU64,
    /// Damage events routed to the sampler.
    pub damage_events: AtomicU64,
    /// Full state resets (identity change, idle, mode switch, command).
    pub resets: AtomicU64,
    /// Operator multiplier overrides.
    pub overrides: AtomicU64,
}

impl DirectorMetrics {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames: AtomicU64::new(0),
            decision_steps: AtomicU64::new(0),
            skipped_steps: AtomicU64::new(0),
            applications: AtomicU64::new(0),
            entities_updated: AtomicU64::new(0),
            resyncs: AtomicU64::new(0),
            dropped_inputs: AtomicU64::new(0),
            damage_events: AtomicU64::new(0),
            resets: AtomicU64::new(0),
            overrides: AtomicU64::new(0),
        }
    }

    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames: Self::get(&self.frames),
            decision_steps: Self::get(&self.decision_steps),
            skipped_steps: Self::get(&self.skipped_steps),
            applications: Self::get(&self.applications),
            entities_updated: Self::get(&self.entities_updated),
            resyncs: Self::get(&self.resyncs),
            dropped_inputs: Self::get(&self.dropped_inputs),
            damage_events: Self::get(&self.damage_events),
            resets: Self::get(&self.resets),
            overrides: Self::get(&self.overrides),
        }
    }
}

impl Default for DirectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub frames: u64,
    pub decision_steps: u64,
    pub skipped_steps: u64,
    pub applications: u64,
    pub entities_updated: u64,
    pub resyncs: u64,
    pub dropped_inputs: u64,
    pub damage_events: u64,
    pub resets: u64,
    pub overrides: u64,
}
