//! Synthetic player for closed-loop simulation.
//!
//! A [`SyntheticPlayer`] with skill `s` in `[0, 1]` fights one opponent at a
//! time. Higher skill lands more and harder hits and gets hit less. Opponent
//! toughness reads back the multipliers the director pushed into the
//! [`SimWorld`], so the loop closes: a harder world slows kills and raises
//! incoming damage.
//!
//! Randomness is a seeded xorshift generator; the same seed replays the same
//! fight.

use adaptdiff_core::{
    Axis, CombatEvent, DamageEvent, DdaConfig, EntityId, EntityRef, PowerAttributes, TrackedPlayer,
};

use crate::HarnessError;
use crate::scenario::{RunReport, ScenarioFrame, ScenarioRunner, SimWorld};
use crate::structured_log::LogEmitter;

/// Marsaglia xorshift64.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// A zero seed is remapped; xorshift never leaves the all-zero state.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1_u64 << 53) as f64
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

const BASE_OPPONENT_HEALTH: f64 = 60.0;
const BASE_INCOMING_HIT: f64 = 6.0;
const FIRST_OPPONENT: EntityId = 100;

pub struct SyntheticPlayer {
    skill: f64,
    rng: XorShift64,
    attributes: PowerAttributes,
    health: f64,
    clock: f64,
    target: EntityId,
    target_damage: f64,
    last_outgoing: Option<f64>,
    last_incoming: Option<f64>,
    kills: u64,
    deaths: u64,
}

impl SyntheticPlayer {
    pub const PLAYER_ID: EntityId = 1;

    /// `skill` must be a finite value in `[0, 1]`.
    pub fn new(skill: f64, seed: u64) -> Result<Self, HarnessError> {
        if !(skill.is_finite() && (0.0..=1.0).contains(&skill)) {
            return Err(HarnessError::InvalidArgument(format!(
                "skill must be within [0, 1], got {skill}"
            )));
        }
        Ok(Self {
            skill,
            rng: XorShift64::new(seed),
            attributes: PowerAttributes {
                max_health: 120.0,
                damage_per_hit: 12.0,
                attacks_per_second: 1.0,
                crit_chance: 0.1,
                move_speed: 7.0,
                ..PowerAttributes::default()
            },
            health: 1.0,
            clock: 0.0,
            target: FIRST_OPPONENT,
            target_damage: 0.0,
            last_outgoing: None,
            last_incoming: None,
            kills: 0,
            deaths: 0,
        })
    }

    #[must_use]
    pub fn skill(&self) -> f64 {
        self.skill
    }

    #[must_use]
    pub fn current_target(&self) -> EntityId {
        self.target
    }

    #[must_use]
    pub fn kills(&self) -> u64 {
        self.kills
    }

    #[must_use]
    pub fn deaths(&self) -> u64 {
        self.deaths
    }

    fn tracked(&self) -> TrackedPlayer {
        TrackedPlayer {
            id: Self::PLAYER_ID,
            attributes: self.attributes,
            engaged: true,
            health_fraction: self.health,
        }
    }

    fn since(last: &mut Option<f64>, now: f64, dt: f64) -> f64 {
        let gap = last.map_or(dt, |t| now - t).max(dt);
        *last = Some(now);
        gap
    }

    /// Produce the next frame against the current state of `world`.
    pub fn next_frame(&mut self, dt: f64, world: &SimWorld) -> ScenarioFrame {
        self.clock += dt;
        let multiplier = |axis| world.effective_multiplier(self.target, axis);
        let hp_mult = multiplier(Axis::MaxHealth);
        let ms_mult = multiplier(Axis::MoveSpeed);
        let as_mult = multiplier(Axis::AttackSpeed);
        let dmg_mult = multiplier(Axis::AttackDamage);

        let mut frame = ScenarioFrame::new(dt, Some(self.tracked()));
        let s = self.skill;

        // Player offense.
        if self.rng.chance((0.05 + 0.15 * s) * dt / 0.1) {
            let crit = if self.rng.chance(self.attributes.crit_chance) { 2.0 } else { 1.0 };
            let amount = self.attributes.damage_per_hit * (0.6 + 0.8 * s) * crit;
            let gap = Self::since(&mut self.last_outgoing, self.clock, dt);
            frame.events.push(CombatEvent::Damage(DamageEvent {
                attacker: Some(EntityRef::player(Self::PLAYER_ID)),
                victim: EntityRef::opponent(self.target),
                amount,
                dt: gap,
            }));
            self.target_damage += amount;
            if self.target_damage >= BASE_OPPONENT_HEALTH * hp_mult {
                frame.events.push(CombatEvent::Defeated {
                    victim: EntityRef::opponent(self.target),
                });
                self.kills += 1;
                self.target += 1;
                self.target_damage = 0.0;
                frame.events.push(CombatEvent::Spawned {
                    entity: EntityRef::opponent(self.target),
                });
            }
        }

        // Opponent offense; faster opponents are harder to evade.
        let p_in = (0.02 + 0.12 * (1.0 - s)) * as_mult * ms_mult.sqrt() * dt / 0.1;
        if self.rng.chance(p_in.min(1.0)) {
            let amount = BASE_INCOMING_HIT * dmg_mult * (1.4 - s);
            let gap = Self::since(&mut self.last_incoming, self.clock, dt);
            frame.events.push(CombatEvent::Damage(DamageEvent {
                attacker: Some(EntityRef::opponent(self.target)),
                victim: EntityRef::player(Self::PLAYER_ID),
                amount,
                dt: gap,
            }));
            self.health -= amount / self.attributes.max_health;
            if self.health <= 0.0 {
                frame.events.push(CombatEvent::Defeated {
                    victim: EntityRef::player(Self::PLAYER_ID),
                });
                self.deaths += 1;
                self.health = 1.0;
            }
        }

        self.health = (self.health + 0.015 * s * dt).min(1.0);
        frame
    }
}

/// Closed-loop run of `player` for `seconds` of simulated time at `dt`.
pub fn simulate(
    config: DdaConfig,
    player: &mut SyntheticPlayer,
    seconds: f64,
    dt: f64,
    log: Option<LogEmitter>,
) -> Result<(RunReport, Option<LogEmitter>), HarnessError> {
    if !(seconds.is_finite() && seconds > 0.0) {
        return Err(HarnessError::InvalidArgument(format!(
            "seconds must be positive, got {seconds}"
        )));
    }
    if !(dt.is_finite() && dt > 0.0 && dt <= seconds) {
        return Err(HarnessError::InvalidArgument(format!(
            "dt must be within (0, {seconds}], got {dt}"
        )));
    }

    let name = format!("synthetic-skill-{:.2}", player.skill());
    let mut runner = ScenarioRunner::new(name, config);
    runner.world_mut().spawn(player.current_target());
    if let Some(emitter) = log {
        runner = runner.with_log(emitter)?;
    }

    let frames = (seconds / dt).round() as u64;
    for _ in 0..frames {
        let frame = player.next_frame(dt, runner.world());
        runner.run_frame(&frame)?;
    }
    runner.finish()
}
