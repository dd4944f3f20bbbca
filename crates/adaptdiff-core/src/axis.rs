//! Difficulty axes: the independently controlled opponent attributes.

use serde::{Deserialize, Serialize};

/// One independently controlled difficulty dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Axis {
    /// Opponent maximum health.
    MaxHealth = 0,
    /// Opponent movement speed.
    MoveSpeed = 1,
    /// Opponent attack speed.
    AttackSpeed = 2,
    /// Opponent damage per hit.
    AttackDamage = 3,
}

impl Axis {
    /// Number of axes.
    pub const COUNT: usize = 4;

    /// All axes in index order.
    pub const ALL: [Axis; Axis::COUNT] = [
        Axis::MaxHealth,
        Axis::MoveSpeed,
        Axis::AttackSpeed,
        Axis::AttackDamage,
    ];

    /// Dense index in `0..COUNT`.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable snake_case name used in logs and snapshots.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaxHealth => "max_health",
            Self::MoveSpeed => "move_speed",
            Self::AttackSpeed => "attack_speed",
            Self::AttackDamage => "attack_damage",
        }
    }

    /// Short label for compact debug text.
    #[must_use]
    pub const fn short_label(self) -> &'static str {
        match self {
            Self::MaxHealth => "HP",
            Self::MoveSpeed => "MS",
            Self::AttackSpeed => "AS",
            Self::AttackDamage => "DMG",
        }
    }

    /// Parse from string (case-insensitive, accepts short labels).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "max_health" | "maxhealth" | "hp" | "health" => Some(Self::MaxHealth),
            "move_speed" | "movespeed" | "ms" | "speed" => Some(Self::MoveSpeed),
            "attack_speed" | "attackspeed" | "as" => Some(Self::AttackSpeed),
            "attack_damage" | "attackdamage" | "dmg" | "damage" => Some(Self::AttackDamage),
            _ => None,
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
