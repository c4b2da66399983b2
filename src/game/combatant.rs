//! Combatant State
//!
//! Per-entity mutable state. Combatants live in the match arena
//! (`MatchState::combatants`) and refer to each other only through
//! [`CombatantId`]s.

use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};

use crate::core::hash::StateHasher;
use crate::core::vec2::Vec2;
use crate::game::moves::{MoveDef, MoveKey};

/// Default maximum health.
pub const MAX_HEALTH: f32 = 100.0;

/// Height of the torso center above the ground point (effects anchor).
pub const CENTER_HEIGHT: f32 = 78.0;

// =============================================================================
// IDENTIFIERS & ENUMS
// =============================================================================

/// Stable arena key. Ordering defines resolution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub u8);

/// Side of the match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Player one's side.
    Blue,
    /// Player two's / the bots' side.
    Red,
}

impl Team {
    /// The other side.
    pub fn opponent(self) -> Team {
        match self {
            Team::Blue => Team::Red,
            Team::Red => Team::Blue,
        }
    }
}

/// Who produces intent for a combatant on this peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Controller {
    /// Input captured on this machine.
    Local,
    /// AI policy.
    Ai,
    /// Input received from the other peer.
    Remote,
}

/// Behavioral state. Exactly one at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorState {
    /// Standing.
    Idle,
    /// Walking.
    Moving,
    /// Executing the active move.
    Attacking,
    /// Short lockout after a move.
    Recovering,
    /// Guard raised.
    Blocking,
    /// Hitstun.
    Staggered,
    /// Dash burst.
    Dashing,
    /// Terminal.
    Dead,
}

impl BehaviorState {
    /// States in which intent (movement/actions) is accepted.
    pub fn accepts_intent(self) -> bool {
        match self {
            BehaviorState::Idle | BehaviorState::Moving | BehaviorState::Blocking => true,
            BehaviorState::Attacking
            | BehaviorState::Recovering
            | BehaviorState::Staggered
            | BehaviorState::Dashing
            | BehaviorState::Dead => false,
        }
    }

    /// States that suspend guard regeneration.
    pub fn suspends_guard_regen(self) -> bool {
        match self {
            BehaviorState::Blocking
            | BehaviorState::Attacking
            | BehaviorState::Staggered
            | BehaviorState::Dead => true,
            BehaviorState::Idle
            | BehaviorState::Moving
            | BehaviorState::Recovering
            | BehaviorState::Dashing => false,
        }
    }

    /// Lowercase name, for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            BehaviorState::Idle => "idle",
            BehaviorState::Moving => "moving",
            BehaviorState::Attacking => "attacking",
            BehaviorState::Recovering => "recovering",
            BehaviorState::Blocking => "blocking",
            BehaviorState::Staggered => "staggered",
            BehaviorState::Dashing => "dashing",
            BehaviorState::Dead => "dead",
        }
    }
}

/// Sword stance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    /// Jodan.
    High,
    /// Chudan.
    #[default]
    Mid,
    /// Gedan.
    Low,
}

impl Stance {
    /// One step higher, saturating.
    pub fn raised(self) -> Stance {
        match self {
            Stance::Low => Stance::Mid,
            Stance::Mid | Stance::High => Stance::High,
        }
    }

    /// One step lower, saturating.
    pub fn lowered(self) -> Stance {
        match self {
            Stance::High => Stance::Mid,
            Stance::Mid | Stance::Low => Stance::Low,
        }
    }
}

/// Speed/power multipliers fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatBlock {
    /// Scales movement and move timings.
    pub speed: f32,
    /// Scales damage dealt.
    pub power: f32,
}

impl StatBlock {
    /// Fast, light hitter.
    pub const SPEED: StatBlock = StatBlock { speed: 1.3, power: 0.8 };
    /// Neutral.
    pub const BALANCED: StatBlock = StatBlock { speed: 1.0, power: 1.0 };
    /// Slow, heavy hitter.
    pub const POWER: StatBlock = StatBlock { speed: 0.8, power: 1.4 };

    /// Create a stat block.
    pub const fn new(speed: f32, power: f32) -> Self {
        Self { speed, power }
    }
}

impl Default for StatBlock {
    fn default() -> Self {
        Self::BALANCED
    }
}

// =============================================================================
// COMBATANT
// =============================================================================

/// State of a single combatant in the match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Combatant {
    /// Arena key
    pub id: CombatantId,
    /// Side
    pub team: Team,
    /// Intent source on this peer
    pub controller: Controller,

    /// Ground position
    pub position: Vec2,
    /// Velocity (units/s)
    pub velocity: Vec2,

    health: f32,
    /// Maximum health
    pub max_health: f32,
    guard: f32,
    dead: bool,

    state: BehaviorState,
    /// Seconds since entering `state`
    pub state_time: f32,
    /// Unit facing direction
    pub facing: Vec2,
    /// Current stance
    pub stance: Stance,

    /// Move being executed, if any
    pub active_move: Option<MoveKey>,
    /// Seconds into `active_move`
    pub move_elapsed: f32,
    /// Remaining action cooldown
    pub cooldown: f32,
    /// Opponents already struck by the current move
    pub hit_registry: BTreeSet<CombatantId>,

    /// Remaining parry window
    pub parry_window: f32,
    /// Stagger value of the current Staggered state
    pub stagger: f32,
    /// How long an AI block is held
    pub block_hold: f32,

    /// AI attack eagerness
    pub ai_aggression: f32,
    /// AI decision countdown
    pub ai_timer: f32,

    /// Fixed stat multipliers
    pub stats: StatBlock,

    /// Cosmetic raised-guard amount (0..1), read by the pose layer
    pub guard_lift: f32,
}

impl Combatant {
    /// Create a combatant at full health, idle, facing right.
    pub fn new(
        id: CombatantId,
        team: Team,
        controller: Controller,
        position: Vec2,
        stats: StatBlock,
    ) -> Self {
        Self {
            id,
            team,
            controller,
            position,
            velocity: Vec2::ZERO,
            health: MAX_HEALTH,
            max_health: MAX_HEALTH,
            guard: 1.0,
            dead: false,
            state: BehaviorState::Idle,
            state_time: 0.0,
            facing: Vec2::RIGHT,
            stance: Stance::Mid,
            active_move: None,
            move_elapsed: 0.0,
            cooldown: 0.0,
            hit_registry: BTreeSet::new(),
            parry_window: 0.0,
            stagger: 0.0,
            block_hold: 0.0,
            ai_aggression: 0.75,
            ai_timer: 0.0,
            stats,
            guard_lift: 0.0,
        }
    }

    /// Alive and targetable.
    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.dead && self.health > 0.0
    }

    /// Terminal flag.
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Current health.
    #[inline]
    pub fn health(&self) -> f32 {
        self.health
    }

    /// Current guard integrity.
    #[inline]
    pub fn guard(&self) -> f32 {
        self.guard
    }

    /// Current behavioral state.
    #[inline]
    pub fn state(&self) -> BehaviorState {
        self.state
    }

    /// Torso center, where strike effects spawn.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.position.x, self.position.y - CENTER_HEIGHT)
    }

    /// Definition of the active move.
    pub fn active_def(&self) -> Option<&'static MoveDef> {
        self.active_move.map(MoveKey::def)
    }

    /// Set health, clamped to `[0, max_health]`. Reaching 0 kills.
    pub fn set_health(&mut self, health: f32) {
        self.health = health.clamp(0.0, self.max_health);
        if self.health <= 0.0 {
            self.kill();
        }
    }

    /// Set guard, clamped to `[0, 1]`.
    pub fn set_guard(&mut self, guard: f32) {
        self.guard = guard.clamp(0.0, 1.0);
    }

    /// Enter the terminal state.
    pub fn kill(&mut self) {
        self.health = 0.0;
        self.dead = true;
        self.end_move();
        self.velocity = Vec2::ZERO;
        self.state = BehaviorState::Dead;
        self.state_time = 0.0;
    }

    /// Switch state and restart the state timer.
    ///
    /// Dead is terminal; the call is ignored once dead.
    pub fn enter_state(&mut self, state: BehaviorState) {
        if self.dead {
            return;
        }
        if state == BehaviorState::Dead {
            self.kill();
            return;
        }
        if self.state == BehaviorState::Attacking && state != BehaviorState::Attacking {
            self.end_move();
        }
        self.state = state;
        self.state_time = 0.0;
    }

    /// Switch between Idle and Moving without restarting the state timer.
    pub(crate) fn set_locomotion(&mut self, state: BehaviorState) {
        debug_assert!(matches!(state, BehaviorState::Idle | BehaviorState::Moving));
        if matches!(self.state, BehaviorState::Idle | BehaviorState::Moving) {
            self.state = state;
        }
    }

    /// Start a new move. The hit registry is cleared here.
    pub fn begin_move(&mut self, key: MoveKey) {
        if self.dead {
            return;
        }
        self.enter_state(BehaviorState::Attacking);
        self.active_move = Some(key);
        self.move_elapsed = 0.0;
        self.hit_registry.clear();
        self.cooldown = 0.0;
        if let Some(stance) = key.def().required.stance() {
            self.stance = stance;
        }
    }

    /// Drop the active move and its registry.
    pub fn end_move(&mut self) {
        self.active_move = None;
        self.move_elapsed = 0.0;
        self.hit_registry.clear();
    }

    /// Force the Staggered state with the given stagger value.
    pub fn stagger_for(&mut self, stagger: f32) {
        if self.dead {
            return;
        }
        self.stagger = stagger;
        self.enter_state(BehaviorState::Staggered);
    }

    /// Hash the synchronized fields (the ones a snapshot carries).
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u8(self.id.0);
        hasher.update_vec2(self.position);
        hasher.update_vec2(self.velocity);
        hasher.update_f32(self.health);
        hasher.update_f32(self.guard);
        hasher.update_str(self.state.as_str());
        hasher.update_f32(self.state_time);
        hasher.update_vec2(self.facing);
        hasher.update_u8(self.stance as u8);
        hasher.update_str(self.active_move.map_or("none", MoveKey::as_str));
        hasher.update_f32(self.move_elapsed);
        hasher.update_f32(self.cooldown);
        hasher.update_bool(self.dead);
    }

    /// Overwrite every synchronized field at once.
    ///
    /// Used by snapshot application. `dead` stays monotonic: a dead local
    /// copy is never revived.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn overwrite_synced(
        &mut self,
        position: Vec2,
        velocity: Vec2,
        health: f32,
        guard: f32,
        state: BehaviorState,
        state_time: f32,
        facing: Vec2,
        stance: Stance,
        active_move: Option<MoveKey>,
        move_elapsed: f32,
        cooldown: f32,
        dead: bool,
    ) {
        if self.active_move != active_move {
            self.hit_registry.clear();
        }
        self.position = position;
        self.velocity = velocity;
        self.health = health.clamp(0.0, self.max_health);
        self.guard = guard.clamp(0.0, 1.0);
        self.state = state;
        self.state_time = state_time;
        self.facing = facing;
        self.stance = stance;
        self.active_move = active_move;
        self.move_elapsed = move_elapsed;
        self.cooldown = cooldown;
        self.dead = self.dead || dead;
        if self.dead {
            self.health = 0.0;
            self.state = BehaviorState::Dead;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fighter() -> Combatant {
        Combatant::new(CombatantId(0), Team::Blue, Controller::Local, Vec2::new(200.0, 400.0), StatBlock::BALANCED)
    }

    #[test]
    fn test_health_clamped_and_kills() {
        let mut c = fighter();
        c.set_health(150.0);
        assert_eq!(c.health(), MAX_HEALTH);
        assert!(c.is_alive());

        c.set_health(-5.0);
        assert_eq!(c.health(), 0.0);
        assert!(c.is_dead());
        assert_eq!(c.state(), BehaviorState::Dead);
    }

    #[test]
    fn test_guard_clamped() {
        let mut c = fighter();
        c.set_guard(1.7);
        assert_eq!(c.guard(), 1.0);
        c.set_guard(-0.3);
        assert_eq!(c.guard(), 0.0);
    }

    #[test]
    fn test_dead_is_terminal() {
        let mut c = fighter();
        c.kill();
        c.enter_state(BehaviorState::Idle);
        assert_eq!(c.state(), BehaviorState::Dead);
        c.begin_move(MoveKey::MenUchi);
        assert!(c.active_move.is_none());
    }

    #[test]
    fn test_begin_move_clears_registry_and_adopts_stance() {
        let mut c = fighter();
        c.hit_registry.insert(CombatantId(7));
        c.begin_move(MoveKey::JodanKesa);
        assert!(c.hit_registry.is_empty());
        assert_eq!(c.state(), BehaviorState::Attacking);
        assert_eq!(c.stance, Stance::High);

        // ANY-stance moves keep the current stance.
        c.begin_move(MoveKey::FrontKick);
        assert_eq!(c.stance, Stance::High);
    }

    #[test]
    fn test_leaving_attack_ends_move() {
        let mut c = fighter();
        c.begin_move(MoveKey::Tsuki);
        c.hit_registry.insert(CombatantId(3));
        c.stagger_for(0.8);
        assert_eq!(c.state(), BehaviorState::Staggered);
        assert!(c.active_move.is_none());
        assert!(c.hit_registry.is_empty());
    }

    #[test]
    fn test_overwrite_never_revives() {
        let mut c = fighter();
        c.kill();
        c.overwrite_synced(
            Vec2::ZERO, Vec2::ZERO, 80.0, 1.0, BehaviorState::Idle, 0.0,
            Vec2::RIGHT, Stance::Mid, None, 0.0, 0.0, false,
        );
        assert!(c.is_dead());
        assert_eq!(c.health(), 0.0);
    }

    #[test]
    fn test_stance_steps() {
        assert_eq!(Stance::Low.raised(), Stance::Mid);
        assert_eq!(Stance::High.raised(), Stance::High);
        assert_eq!(Stance::High.lowered(), Stance::Mid);
        assert_eq!(Stance::Low.lowered(), Stance::Low);
    }
}
