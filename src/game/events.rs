//! Combat Events
//!
//! Discrete outcomes produced by a tick. Strike events feed the (external)
//! effects layer; nothing here is read back by the simulation.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::combatant::{CombatantId, Team};
use crate::game::moves::MoveKey;

// =============================================================================
// OUTCOMES
// =============================================================================

/// Outcome class of one attacker/defender interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Damage landed, or the guard broke.
    Hit,
    /// Absorbed by the guard.
    Blocked,
    /// Deflected during the parry window.
    Parry,
}

impl Outcome {
    /// Number of sparks the effects layer spawns for this outcome.
    pub fn spark_count(self) -> u32 {
        match self {
            Outcome::Hit => 8,
            Outcome::Blocked => 5,
            Outcome::Parry => 8,
        }
    }

    /// Screen-shake impulse for this outcome (parries do not shake).
    pub fn impact(self) -> f32 {
        match self {
            Outcome::Hit | Outcome::Blocked => 5.0,
            Outcome::Parry => 0.0,
        }
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CombatEventData {
    /// An active move connected with a defender.
    Strike {
        /// Striking combatant
        attacker: CombatantId,
        /// Struck combatant
        defender: CombatantId,
        /// Move that connected
        move_key: MoveKey,
        /// Resolution result
        outcome: Outcome,
        /// Guard was depleted by this strike
        guard_broken: bool,
        /// Health removed from the defender
        damage: f32,
        /// Where the effect spawns (defender torso)
        position: Vec2,
        /// Attack direction (attacker facing)
        direction: Vec2,
    },

    /// A combatant's health reached zero.
    Died {
        /// Who fell
        victim: CombatantId,
        /// Who landed the blow
        killer: Option<CombatantId>,
    },

    /// Match ended.
    MatchEnded {
        /// Winning team, `None` on a draw
        winner: Option<Team>,
        /// Ticks played
        duration_ticks: u32,
    },
}

/// A combat event with timing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
    /// Tick when the event occurred
    pub tick: u32,
    /// Event data
    pub data: CombatEventData,
}

impl CombatEvent {
    /// Create a new event.
    pub fn new(tick: u32, data: CombatEventData) -> Self {
        Self { tick, data }
    }

    /// Outcome of a strike event.
    pub fn outcome(&self) -> Option<Outcome> {
        match &self.data {
            CombatEventData::Strike { outcome, .. } => Some(*outcome),
            CombatEventData::Died { .. } | CombatEventData::MatchEnded { .. } => None,
        }
    }
}

// =============================================================================
// EFFECT COUNTS
// =============================================================================

/// Per-outcome tally of cosmetic side effects for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectCounts {
    /// Hit outcomes (including guard breaks)
    pub hits: u32,
    /// Blocked outcomes
    pub blocks: u32,
    /// Parry outcomes
    pub parries: u32,
    /// Sparks to spawn
    pub sparks: u32,
    /// Accumulated screen shake
    pub shake: f32,
}

impl EffectCounts {
    /// Record one outcome.
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Hit => self.hits += 1,
            Outcome::Blocked => self.blocks += 1,
            Outcome::Parry => self.parries += 1,
        }
        self.sparks += outcome.spark_count();
        self.shake = self.shake.max(outcome.impact());
    }

    /// Total interactions recorded.
    pub fn total(&self) -> u32 {
        self.hits + self.blocks + self.parries
    }
}

// =============================================================================
// TESTS
// =============================================================================
