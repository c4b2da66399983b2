//! Game Logic Module
//!
//! The combat simulation. No I/O; a single owner drives it.
//!
//! ## Module Structure
//!
//! - `moves`: Immutable move catalog
//! - `combatant`: Per-entity state and its enums
//! - `input`: Input frames and the edge-trigger latch
//! - `state_machine`: Timers, kinematics, transitions, player intent
//! - `hit`: Parry / block / hit resolution
//! - `ai`: Bot policy
//! - `events`: Cosmetic strike events
//! - `state`: Match state (arena, RNG, phase)
//! - `tick`: Authoritative simulation step

pub mod moves;
pub mod combatant;
pub mod input;
pub mod state_machine;
pub mod hit;
pub mod ai;
pub mod events;
pub mod state;
pub mod tick;

// Re-export key types
pub use moves::{MoveDef, MoveKey, MovePhase};
pub use combatant::{BehaviorState, Combatant, CombatantId, Controller, Stance, StatBlock, Team};
pub use input::{InputFrame, InputLatch};
pub use events::{CombatEvent, CombatEventData, EffectCounts, Outcome};
pub use state::{MatchOutcome, MatchPhase, MatchSetup, MatchState, Seat};
pub use tick::{tick, TickResult};
