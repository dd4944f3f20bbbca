//! Read-only director snapshot for debug overlays and logs.

use std::fmt::Write as _;

use serde::Serialize;

use crate::config::{ControlMode, GeneLimits};
use crate::decision::axis_controller::AxisState;
use crate::events::EntityId;
use crate::metrics::MetricsSnapshot;
use crate::power::PowerSample;
use crate::telemetry::SensorSample;

/// One axis row: controller state plus the actuator's stored value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisRow {
    #[serde(flatten)]
    pub state: AxisState,
    pub actuator_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectorSnapshot {
    pub mode: ControlMode,
    pub tracked_player: Option<EntityId>,
    pub limits: GeneLimits,
    pub step_interval_seconds: f64,
    pub accumulated_seconds: f64,
    pub seconds_until_next_step: f64,
    pub axes: Vec<AxisRow>,
    pub sensors: Option<SensorSample>,
    pub power: Option<PowerSample>,
    pub metrics: MetricsSnapshot,
}

impl DirectorSnapshot {
    /// Multi-line text for an on-screen overlay.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::with_capacity(512);
        let player = self
            .tracked_player
            .map_or_else(|| "none".to_string(), |id| id.to_string());
        let _ = writeln!(
            out,
            "dda {} | player {} | next step {:.1}s / {:.1}s | range [{:.3}, {:.3}]",
            self.mode.as_str(),
            player,
            self.seconds_until_next_step,
            self.step_interval_seconds,
            self.limits.floor,
            self.limits.cap,
        );

        match &self.sensors {
            Some(s) => {
                let _ = writeln!(
                    out,
                    "in {:.1}/s ({:.2}) out {:.1}/s ({:.2}) hits {:.2}/s ({:.2}) engaged {:.2} low_hp {:.2} deaths {:.0} ({:.2}) ttk {:.1}s ({:.2})",
                    s.incoming_damage_rate,
                    s.incoming_damage_norm01,
                    s.outgoing_damage_rate,
                    s.outgoing_damage_norm01,
                    s.hit_rate_on_target,
                    s.hit_rate_norm01,
                    s.engaged_uptime,
                    s.low_resource_uptime,
                    s.deaths_per_window,
                    s.deaths_norm01,
                    s.avg_time_to_defeat_seconds,
                    s.avg_time_to_defeat_norm01,
                );
            }
            None => out.push_str("sensors: no sample\n"),
        }

        if let Some(p) = &self.power {
            let _ = writeln!(
                out,
                "power off {:.2} def {:.2} mob {:.2} total {:.2}",
                p.offense, p.defense, p.mobility, p.total
            );
        }

        for row in &self.axes {
            let st = &row.state;
            let _ = writeln!(
                out,
                "{:<3} x{:.3} theta {:+.3} v {:+.3} skill {:.2} chal {:.2} err {:+.2} dtheta {:+.4} steps {} {}",
                st.axis.short_label(),
                row.actuator_multiplier,
                st.theta,
                st.velocity,
                st.last.skill01,
                st.last.challenge01,
                st.last.error,
                st.last.delta_theta,
                st.steps_done,
                if st.enabled { "on" } else { "off" },
            );
        }

        let m = &self.metrics;
        let _ = write!(
            out,
            "steps {} applies {} entities {} resyncs {} dropped {} resets {}",
            m.decision_steps,
            m.applications,
            m.entities_updated,
            m.resyncs,
            m.dropped_inputs,
            m.resets,
        );
        out
    }
}
