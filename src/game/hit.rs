//! Hit Resolution
//!
//! Outcome of one attacker-move / defender interaction. Evaluation order is
//! fixed: Parry, then Block, then Hit. Only the Hit branch removes health;
//! a guard break staggers without damage.

use crate::config::CombatConfig;
use crate::core::vec2::{Vec2, angle_diff};
use crate::game::combatant::{BehaviorState, Combatant};
use crate::game::events::Outcome;
use crate::game::moves::MoveDef;

// =============================================================================
// STRIKE ZONE & RESOLUTION
// =============================================================================

/// Result of resolving one strike.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Strike {
    /// Outcome class (a guard break reports `Hit`)
    pub outcome: Outcome,
    /// The defender's guard was depleted
    pub guard_broken: bool,
    /// Health actually removed from the defender
    pub damage: f32,
    /// Stagger value the caller must apply to the attacker (parry counter)
    pub attacker_stagger: Option<f32>,
    /// The defender died from this strike
    pub killed: bool,
}

/// Whether `defender` lies inside the strike zone of `attacker`'s move.
///
/// Distance must be below `reach + margin` and the bearing within `arc`
/// radians of the attacker's facing.
pub fn in_strike_zone(attacker: &Combatant, defender: &Combatant, m: &MoveDef, margin: f32) -> bool {
    let to_defender = defender.position - attacker.position;
    if to_defender.length() >= m.reach + margin {
        return false;
    }
    angle_diff(to_defender.angle(), attacker.facing.angle()).abs() < m.arc
}

/// Resolve one strike against `defender`.
///
/// `direction` is the attacker's facing; `power` the attacker's power stat.
/// Mutates only the defender; attacker-side effects are returned.
pub fn resolve_strike(
    m: &MoveDef,
    power: f32,
    direction: Vec2,
    defender: &mut Combatant,
    config: &CombatConfig,
) -> Strike {
    let blocking = defender.state() == BehaviorState::Blocking;

    // 1. Parry
    if blocking && defender.parry_window > 0.0 {
        defender.set_guard(defender.guard() + config.parry_guard_bonus);
        defender.cooldown = 0.0;
        defender.parry_window = 0.0;
        defender.enter_state(BehaviorState::Idle);
        return Strike {
            outcome: Outcome::Parry,
            guard_broken: false,
            damage: 0.0,
            attacker_stagger: Some(config.parry_stagger),
            killed: false,
        };
    }

    // 2. Block
    if blocking && defender.guard() > 0.0 {
        let remaining = defender.guard() - m.guard_break;
        defender.set_guard(remaining);
        defender.velocity += direction * config.block_knockback;
        defender.stagger = config.block_stagger;

        if remaining <= 0.0 {
            defender.stagger_for(config.guard_break_stagger);
            return Strike {
                outcome: Outcome::Hit,
                guard_broken: true,
                damage: 0.0,
                attacker_stagger: None,
                killed: false,
            };
        }
        return Strike {
            outcome: Outcome::Blocked,
            guard_broken: false,
            damage: 0.0,
            attacker_stagger: None,
            killed: false,
        };
    }

    // 3. Hit
    let before = defender.health();
    defender.velocity += direction * (config.hit_knockback * (1.0 + m.knock));
    defender.stagger_for(config.hit_stagger);
    defender.set_health(before - m.damage * power);

    Strike {
        outcome: Outcome::Hit,
        guard_broken: false,
        damage: before - defender.health(),
        attacker_stagger: None,
        killed: defender.is_dead(),
    }
}

// =============================================================================
// TESTS
// =============================================================================


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::game::combatant::{CombatantId, Controller, StatBlock, Team, MAX_HEALTH};
    use crate::game::moves::MoveKey;
    use proptest::prelude::*;

    proptest! {
        /// Any sequence of strikes keeps health and guard inside their ranges,
        /// and a dead defender stays dead.
        #[test]
        fn prop_strikes_keep_stats_bounded(
            strikes in proptest::collection::vec((0usize..5, 0.5f32..1.5, any::<bool>(), 0.0f32..1.0, 0.0f32..0.2), 1..40)
        ) {
            let config = CombatConfig::default();
            let mut d = Combatant::new(CombatantId(1), Team::Red, Controller::Remote, Vec2::new(500.0, 400.0), StatBlock::SPEED);
            let mut was_dead = false;

            for (move_idx, power, block, guard, parry) in strikes {
                if block && d.is_alive() && d.state().accepts_intent() {
                    d.enter_state(BehaviorState::Blocking);
                    d.set_guard(guard);
                    d.parry_window = parry;
                }
                resolve_strike(MoveKey::ALL[move_idx].def(), power, Vec2::LEFT, &mut d, &config);

                prop_assert!((0.0..=MAX_HEALTH).contains(&d.health()));
                prop_assert!((0.0..=1.0).contains(&d.guard()));
                prop_assert!(!was_dead || d.is_dead());
                was_dead = d.is_dead();
            }
        }
    }
}
