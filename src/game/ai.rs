//! AI Policy
//!
//! Intent for bot-controlled combatants. Planning reads an immutable view of
//! the arena and produces an [`AiPlan`]; applying the plan is the only
//! mutation, so no combatant is ever borrowed twice.

use std::collections::BTreeMap;

use crate::config::AiConfig;
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::combatant::{BehaviorState, Combatant, CombatantId};
use crate::game::moves::MoveKey;

// =============================================================================
// PLAN TYPES
// =============================================================================

/// Action chosen by the policy this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AiAction {
    /// Begin a move.
    Attack(MoveKey),
    /// Raise a timed guard.
    Block {
        /// How long to hold it
        hold: f32,
        /// Parry window opened with it
        parry_window: f32,
    },
}

/// Everything the policy decided for one combatant on one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct AiPlan {
    /// Chosen target
    pub target: Option<CombatantId>,
    /// New facing, if it changes
    pub facing: Option<Vec2>,
    /// Separation impulse from allies
    pub push: Vec2,
    /// Approach / retreat / circling impulse
    pub accel: Vec2,
    /// Idle or Moving
    pub locomotion: Option<BehaviorState>,
    /// Decision timer after this tick
    pub timer: f32,
    /// Action to start
    pub action: Option<AiAction>,
}

impl AiPlan {
    fn idle(me: &Combatant, push: Vec2) -> Self {
        Self {
            target: None,
            facing: None,
            push,
            accel: Vec2::ZERO,
            locomotion: None,
            timer: me.ai_timer,
            action: None,
        }
    }
}

// =============================================================================
// OBSERVATION
// =============================================================================

/// Nearest living combatant on the opposing team. Ties go to the lower id.
pub fn nearest_target<'a>(
    me: &Combatant,
    arena: &'a BTreeMap<CombatantId, Combatant>,
) -> Option<&'a Combatant> {
    let opponent = me.team.opponent();
    let mut best: Option<(&Combatant, f32)> = None;
    for other in arena.values() {
        if other.team != opponent || !other.is_alive() {
            continue;
        }
        let d = me.position.distance(other.position);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((other, d));
        }
    }
    best.map(|(c, _)| c)
}

/// Sum of pushes away from living allies closer than the minimum distance.
///
/// Each ally contributes `normalize(me - ally) * strength * (min - d) * dt`.
pub fn separation_impulse(
    me: &Combatant,
    arena: &BTreeMap<CombatantId, Combatant>,
    dt: f32,
    config: &AiConfig,
) -> Vec2 {
    let mut push = Vec2::ZERO;
    for ally in arena.values() {
        if ally.id == me.id || ally.team != me.team || !ally.is_alive() {
            continue;
        }
        let away = me.position - ally.position;
        let d = away.length();
        if d < config.separation_distance {
            let overlap = config.separation_distance - d;
            push += away.normalize() * (config.separation_strength * overlap * dt);
        }
    }
    push
}

// =============================================================================
// POLICY
// =============================================================================

/// Decide what `me` does this tick.
///
/// Separation always applies. Facing, movement and decisions need a target;
/// movement and decisions additionally need Idle or Moving.
pub fn plan(
    me: &Combatant,
    arena: &BTreeMap<CombatantId, Combatant>,
    dt: f32,
    rng: &mut DeterministicRng,
    config: &AiConfig,
) -> AiPlan {
    let push = separation_impulse(me, arena, dt, config);
    let Some(target) = nearest_target(me, arena) else {
        return AiPlan::idle(me, push);
    };

    let mut out = AiPlan::idle(me, push);
    out.target = Some(target.id);
    out.timer = me.ai_timer - dt;

    let to_target = target.position - me.position;
    let dist = to_target.length();
    let mut facing = me.facing;
    if dist > config.face_min_distance {
        facing = to_target.normalize();
        out.facing = Some(facing);
    }

    if !matches!(me.state(), BehaviorState::Idle | BehaviorState::Moving) {
        return out;
    }

    let dir = to_target.normalize();
    if dist > config.desired_distance + config.distance_margin {
        out.accel = dir * (config.approach_accel * dt);
        out.locomotion = Some(BehaviorState::Moving);
    } else if dist < config.desired_distance - config.distance_margin {
        out.accel = -dir * (config.approach_accel * dt);
        out.locomotion = Some(BehaviorState::Moving);
    } else {
        // Circle the target.
        out.accel = facing.perpendicular() * (config.strafe_accel * dt);
        out.locomotion = Some(BehaviorState::Idle);
    }

    if me.cooldown <= 0.0 && out.timer <= 0.0 {
        if dist < config.attack_range && rng.chance(config.attack_chance * me.ai_aggression) {
            if let Some(&key) = rng.choose(&MoveKey::ALL) {
                out.action = Some(AiAction::Attack(key));
                out.timer = rng.next_range(config.decision_interval.0, config.decision_interval.1);
            }
        } else if rng.chance(config.block_chance) {
            out.action = Some(AiAction::Block {
                hold: rng.next_range(config.block_hold.0, config.block_hold.1),
                parry_window: config.parry_window,
            });
            out.timer = config.block_decision_delay;
        }
    }

    out
}

/// Apply a plan to its combatant.
pub fn apply(me: &mut Combatant, plan: &AiPlan) {
    me.ai_timer = plan.timer;
    if let Some(facing) = plan.facing {
        me.facing = facing;
    }
    me.velocity += plan.push + plan.accel;
    if let Some(state) = plan.locomotion {
        me.set_locomotion(state);
    }
    match plan.action {
        Some(AiAction::Attack(key)) => me.begin_move(key),
        Some(AiAction::Block { hold, parry_window }) => {
            me.enter_state(BehaviorState::Blocking);
            me.block_hold = hold;
            me.parry_window = parry_window;
        }
        None => {}
    }
}

// =============================================================================
// TESTS
// =============================================================================
