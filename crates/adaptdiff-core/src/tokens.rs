//! Integer stat-token encoding of multipliers.
//!
//! Hosts that can only stack whole "+1 %" / "-1 %" modifiers express a
//! multiplier `m` as a net token count `round((m - 1) * 100)`. Token counts
//! are set exactly, so re-applying the same multiplier writes nothing.

use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::events::EntityId;

/// Percentage points per token.
pub const TOKEN_PERCENT: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// +1 % per token.
    Boost,
    /// -1 % per token.
    Penalty,
}

/// Exact token counts for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPlan {
    pub axis: Axis,
    pub boost: u32,
    pub penalty: u32,
}

impl TokenPlan {
    /// Encode `multiplier`. Non-finite input encodes as neutral.
    #[must_use]
    pub fn for_multiplier(axis: Axis, multiplier: f64) -> Self {
        let net = if multiplier.is_finite() {
            ((multiplier - 1.0) * TOKEN_PERCENT).round()
        } else {
            0.0
        };
        // Saturating float-to-int casts keep absurd multipliers bounded.
        let magnitude = net.abs().min(f64::from(u32::MAX)) as u32;
        if net >= 0.0 {
            Self {
                axis,
                boost: magnitude,
                penalty: 0,
            }
        } else {
            Self {
                axis,
                boost: 0,
                penalty: magnitude,
            }
        }
    }

    #[must_use]
    pub fn net(&self) -> i64 {
        i64::from(self.boost) - i64::from(self.penalty)
    }

    /// Multiplier the host will effectively apply.
    #[must_use]
    pub fn effective_multiplier(&self) -> f64 {
        1.0 + self.net() as f64 / TOKEN_PERCENT
    }

    #[must_use]
    pub fn count(&self, kind: TokenKind) -> u32 {
        match kind {
            TokenKind::Boost => self.boost,
            TokenKind::Penalty => self.penalty,
        }
    }
}

/// Per-entity token storage on the host side.
pub trait TokenInventory {
    fn token_count(&self, entity: EntityId, axis: Axis, kind: TokenKind) -> u32;
    fn set_token_count(&mut self, entity: EntityId, axis: Axis, kind: TokenKind, count: u32);
}

/// Bring `entity` to exactly the counts in `plan`. Returns true when anything
/// was written.
pub fn apply_tokens<I: TokenInventory + ?Sized>(
    inventory: &mut I,
    entity: EntityId,
    plan: &TokenPlan,
) -> bool {
    let mut wrote = false;
    for kind in [TokenKind::Boost, TokenKind::Penalty] {
        let want = plan.count(kind);
        if inventory.token_count(entity, plan.axis, kind) != want {
            inventory.set_token_count(entity, plan.axis, kind, want);
            wrote = true;
        }
    }
    wrote
}
