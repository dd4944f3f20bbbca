//! Decision layer: skill estimation, per-axis controllers, and step cadence.

pub mod axis_controller;
pub mod skill;
pub mod step_clock;

pub use axis_controller::{AxisController, AxisState, AxisTuning, AxisTuningTable};
pub use skill::{SkillModel, SkillSignal, SkillWeights};
pub use step_clock::StepClock;
