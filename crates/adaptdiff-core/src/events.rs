//! Host event feed pushed into the orchestrator.

use serde::{Deserialize, Serialize};

/// Host-assigned entity identifier.
pub type EntityId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Opponent,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: EntityId,
    pub side: Side,
}

impl EntityRef {
    #[must_use]
    pub const fn new(id: EntityId, side: Side) -> Self {
        Self { id, side }
    }

    #[must_use]
    pub const fn player(id: EntityId) -> Self {
        Self::new(id, Side::Player)
    }

    #[must_use]
    pub const fn opponent(id: EntityId) -> Self {
        Self::new(id, Side::Opponent)
    }
}

/// One damage report. `dt` is the time since the previous damage report on
/// the same channel; `attacker` is absent for environmental damage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageEvent {
    #[serde(default)]
    pub attacker: Option<EntityRef>,
    pub victim: EntityRef,
    pub amount: f64,
    pub dt: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CombatEvent {
    Damage(DamageEvent),
    Defeated { victim: EntityRef },
    Spawned { entity: EntityRef },
}

/// How the orchestrator classified a damage event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageRoute {
    Incoming,
    Outgoing,
    /// Valid routing, but the sampler rejected the numbers.
    Rejected,
    /// Not involving the tracked player, or no player tracked.
    Ignored,
}
