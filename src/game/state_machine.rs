//! Combatant State Machine
//!
//! Timer decay, kinematics, timed transitions and player intent for a single
//! combatant. The stepper calls these in a fixed order every tick; the
//! replica only ever calls [`advance_kinematics`].
//!
//! Transition table (anything not listed is not a legal exit):
//!
//! | from       | to         | when                                   |
//! |------------|------------|----------------------------------------|
//! | Idle/Moving| Attacking  | attack intent, cooldown ≤ 0            |
//! | Idle/Moving| Blocking   | block intent, cooldown ≤ 0             |
//! | Idle/Moving| Dashing    | dash intent, cooldown ≤ 0              |
//! | Attacking  | Recovering | `move_elapsed ≥ total / speed`         |
//! | Recovering | Idle       | `state_time > recover_time`            |
//! | Dashing    | Idle       | `state_time > dash_time`               |
//! | Blocking   | Idle       | hold released / AI hold elapsed        |
//! | Staggered  | Idle       | `state_time > base + stagger * scale`  |
//! | any        | Dead       | health reaches 0                       |

use crate::config::{ArenaConfig, CombatConfig, MotionConfig};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::combatant::{BehaviorState, Combatant, Controller};
use crate::game::input::InputFrame;
use crate::game::moves::MoveKey;

/// Action started by intent application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Dash burst along facing.
    Dash,
    /// Began a move.
    Attack(MoveKey),
    /// Raised guard (parry window open).
    Block,
}

// =============================================================================
// TIMERS & KINEMATICS
// =============================================================================

/// Advance state/move timers and decay cooldown and parry window.
pub fn decay_timers(c: &mut Combatant, dt: f32) {
    c.state_time += dt;
    if c.active_move.is_some() {
        c.move_elapsed += dt;
    }
    c.cooldown = (c.cooldown - dt).max(0.0);
    c.parry_window = (c.parry_window - dt).max(0.0);
}

/// Exponential drag, position integration and arena clamp.
///
/// Drag is expressed per 1/60 s so damping does not depend on frame rate.
pub fn integrate(c: &mut Combatant, dt: f32, motion: &MotionConfig, arena: &ArenaConfig) {
    c.velocity = c.velocity * motion.drag.powf(dt * 60.0);
    c.position += c.velocity * dt;
    c.position = c.position.clamp_to(arena.min, arena.max);
}

/// Timers plus kinematics. Dead combatants are frozen.
///
/// This is all a replica runs between snapshots.
pub fn advance_kinematics(c: &mut Combatant, dt: f32, motion: &MotionConfig, arena: &ArenaConfig) {
    if c.is_dead() {
        return;
    }
    decay_timers(c, dt);
    integrate(c, dt, motion, arena);
}

// =============================================================================
// TRANSITIONS
// =============================================================================

/// Guard regeneration, cosmetic guard lift, and timed state exits.
///
/// `block_held` is the level-triggered block intent of a Local/Remote
/// combatant; AI blocks end on their own `block_hold` timer instead.
/// Returns the new state when a transition happened.
pub fn advance_transitions(
    c: &mut Combatant,
    dt: f32,
    block_held: bool,
    motion: &MotionConfig,
) -> Option<BehaviorState> {
    if c.is_dead() {
        return None;
    }

    if !c.state().suspends_guard_regen() {
        c.set_guard(c.guard() + motion.guard_regen * dt);
    }
    c.guard_lift = (c.guard_lift - motion.guard_lift_decay * dt).max(0.0);

    let speed = c.stats.speed;
    let next = match c.state() {
        BehaviorState::Staggered => {
            let duration = motion.stagger_base + c.stagger * motion.stagger_scale;
            (c.state_time > duration).then_some(BehaviorState::Idle)
        }
        BehaviorState::Attacking => match c.active_def() {
            Some(def) if c.move_elapsed < def.duration(speed) => None,
            Some(def) => {
                c.cooldown = def.recover / speed;
                Some(BehaviorState::Recovering)
            }
            None => Some(BehaviorState::Recovering),
        },
        BehaviorState::Recovering => {
            (c.state_time > motion.recover_time).then_some(BehaviorState::Idle)
        }
        BehaviorState::Dashing => {
            if c.state_time > motion.dash_time {
                c.velocity = Vec2::ZERO;
                Some(BehaviorState::Idle)
            } else {
                None
            }
        }
        BehaviorState::Blocking => {
            c.guard_lift = 1.0;
            c.velocity = c.velocity * motion.block_drag;
            let released = match c.controller {
                Controller::Ai => c.state_time > c.block_hold,
                Controller::Local | Controller::Remote => !block_held,
            };
            released.then_some(BehaviorState::Idle)
        }
        BehaviorState::Idle | BehaviorState::Moving | BehaviorState::Dead => None,
    };

    if let Some(state) = next {
        c.enter_state(state);
    }
    next
}

// =============================================================================
// PLAYER INTENT
// =============================================================================

/// Apply one input frame to a Local or Remote combatant.
///
/// Only Idle/Moving/Blocking accept intent. Facing turns toward the aim
/// point; an aim of exactly `Vec2::ZERO` (or one on top of the combatant)
/// leaves facing unchanged. Actions need `cooldown ≤ 0` and a lowered
/// guard, with priority dash, attack, block.
pub fn apply_player_intent(
    c: &mut Combatant,
    frame: &InputFrame,
    dt: f32,
    rng: &mut DeterministicRng,
    motion: &MotionConfig,
    combat: &CombatConfig,
) -> Option<Action> {
    if !c.state().accepts_intent() {
        return None;
    }

    let dir = frame.move_direction();
    if !dir.is_zero() {
        c.velocity += dir * (motion.move_accel * c.stats.speed * dt);
        c.set_locomotion(BehaviorState::Moving);
    } else if c.state() == BehaviorState::Moving {
        c.set_locomotion(BehaviorState::Idle);
    }

    if frame.aim.is_finite() && !frame.aim.is_zero() {
        let to_aim = frame.aim - c.position;
        if !to_aim.is_zero() {
            c.facing = to_aim.normalize();
        }
    }

    if frame.stance_up_pressed() {
        c.stance = c.stance.raised();
    }
    if frame.stance_down_pressed() {
        c.stance = c.stance.lowered();
    }

    if c.cooldown > 0.0 || c.state() == BehaviorState::Blocking {
        return None;
    }

    if frame.dash_pressed() {
        c.enter_state(BehaviorState::Dashing);
        c.velocity = c.facing * motion.dash_speed;
        c.cooldown = motion.dash_cooldown;
        return Some(Action::Dash);
    }

    if frame.attack_pressed() {
        let key = if frame.kick_held() {
            Some(MoveKey::FrontKick)
        } else {
            rng.choose(&MoveKey::usable_from(c.stance)).copied()
        };
        if let Some(key) = key {
            c.begin_move(key);
            return Some(Action::Attack(key));
        }
    }

    if frame.block_held() {
        c.enter_state(BehaviorState::Blocking);
        c.parry_window = combat.player_parry_window;
        return Some(Action::Block);
    }

    None
}

// =============================================================================
// TESTS
// =============================================================================
