//! Thread-safe handle for multi-threaded hosts.
//!
//! All mutation of one tracked-player session is serialized behind a single
//! `parking_lot::Mutex`, so sampler, controllers and actuators are never
//! observed half-updated. Clones share the same session.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::actuators::HostWorld;
use crate::axis::Axis;
use crate::config::{ControlMode, DdaConfig};
use crate::events::CombatEvent;
use crate::orchestrator::{DecisionOrchestrator, FrameInput, FrameReport, OverrideOutcome};
use crate::snapshot::DirectorSnapshot;

#[derive(Debug, Clone)]
pub struct SharedOrchestrator {
    inner: Arc<Mutex<DecisionOrchestrator>>,
}

impl SharedOrchestrator {
    #[must_use]
    pub fn new(config: DdaConfig) -> Self {
        Self::from_orchestrator(DecisionOrchestrator::new(config))
    }

    #[must_use]
    pub fn from_orchestrator(orchestrator: DecisionOrchestrator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(orchestrator)),
        }
    }

    /// Run `f` with exclusive access.
    pub fn with<R>(&self, f: impl FnOnce(&mut DecisionOrchestrator) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    pub fn tick_frame<W: HostWorld + ?Sized>(&self, frame: &FrameInput, world: &mut W) -> FrameReport {
        self.inner.lock().tick_frame(frame, world)
    }

    pub fn handle_event<W: HostWorld + ?Sized>(&self, event: &CombatEvent, world: &mut W) {
        self.inner.lock().handle_event(event, world);
    }

    pub fn override_multiplier<W: HostWorld + ?Sized>(
        &self,
        axis: Axis,
        value: f64,
        world: &mut W,
    ) -> OverrideOutcome {
        self.inner.lock().override_multiplier(axis, value, world)
    }

    pub fn set_mode(&self, mode: ControlMode) -> bool {
        self.inner.lock().set_mode(mode)
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    #[must_use]
    pub fn multiplier(&self, axis: Axis) -> f64 {
        self.inner.lock().multiplier(axis)
    }

    #[must_use]
    pub fn snapshot(&self) -> DirectorSnapshot {
        self.inner.lock().snapshot()
    }
}

impl Default for SharedOrchestrator {
    fn default() -> Self {
        Self::new(DdaConfig::default())
    }
}
