//! Authoritative Simulation Tick
//!
//! Advances every combatant one step in a fixed order:
//!
//! 1. decay timers
//! 2. integrate velocity (drag) and position, clamp to the arena
//! 3. state machine transitions
//! 4. intent: Local/Remote input frames, AI plans
//! 5. hit resolution for every attacker in its active phase
//! 6. win condition
//!
//! Only the authority runs this. Combatants are visited in id order at
//! every step so the outcome is a function of state, inputs and seed.

use std::collections::BTreeMap;

use tracing::info;
#[cfg(feature = "debug-tracing")]
use tracing::trace;

use crate::config::SimConfig;
use crate::core::vec2::Vec2;
use crate::game::ai;
use crate::game::combatant::{BehaviorState, CombatantId, Controller, Team};
use crate::game::events::{CombatEvent, CombatEventData, EffectCounts};
use crate::game::hit::{in_strike_zone, resolve_strike};
use crate::game::input::InputFrame;
use crate::game::moves::{MoveKey, MovePhase};
use crate::game::state::{MatchPhase, MatchState};
use crate::game::state_machine::{advance_transitions, apply_player_intent, decay_timers, integrate};

// =============================================================================
// TICK
// =============================================================================

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<CombatEvent>,
    /// Whether the match is over (ended this tick or earlier)
    pub match_ended: bool,
    /// Winner (if match ended with winner)
    pub winner: Option<Team>,
    /// Cosmetic side-effect tally for the effects layer
    pub effects: EffectCounts,
}

/// Clamp a frame delta into `[0, max_dt]`; non-finite deltas become 0.
#[inline]
pub fn clamp_dt(dt: f32, max_dt: f32) -> f32 {
    if dt.is_finite() {
        dt.clamp(0.0, max_dt)
    } else {
        0.0
    }
}

/// Run one simulation tick.
///
/// # Arguments
///
/// * `state` - The match state (will be mutated)
/// * `inputs` - Frames for Local/Remote combatants; a missing entry means no intent
/// * `dt` - Elapsed seconds, clamped to `config.max_dt`
/// * `config` - Simulation configuration
pub fn tick(
    state: &mut MatchState,
    inputs: &BTreeMap<CombatantId, InputFrame>,
    dt: f32,
    config: &SimConfig,
) -> TickResult {
    let mut result = TickResult::default();

    match state.phase {
        MatchPhase::Ended => {
            result.match_ended = true;
            result.winner = state.outcome.and_then(|o| o.winner());
            return result;
        }
        MatchPhase::Playing => {}
    }

    let dt = clamp_dt(dt, config.max_dt);
    state.tick += 1;

    // 1. Timers
    for c in state.combatants.values_mut().filter(|c| !c.is_dead()) {
        decay_timers(c, dt);
    }

    // 2. Kinematics
    for c in state.combatants.values_mut().filter(|c| !c.is_dead()) {
        integrate(c, dt, &config.motion, &config.arena);
    }

    // 3. Transitions
    for c in state.combatants.values_mut() {
        let block_held = inputs.get(&c.id).is_some_and(InputFrame::block_held);
        let _entered = advance_transitions(c, dt, block_held, &config.motion);
        #[cfg(feature = "debug-tracing")]
        if let Some(s) = _entered {
            trace!(tick = state.tick, id = c.id.0, state = s.as_str(), "transition");
        }
    }

    // 4. Intent
    apply_intent(state, inputs, dt, config);

    // 5. Strikes
    resolve_strikes(state, config, &mut result);

    // 6. Win condition
    if let Some(outcome) = state.decide() {
        state.end(outcome);
        result.match_ended = true;
        result.winner = outcome.winner();
        state.push_event(CombatEvent::new(
            state.tick,
            CombatEventData::MatchEnded {
                winner: outcome.winner(),
                duration_ticks: state.tick,
            },
        ));
        info!(tick = state.tick, ?outcome, "Match ended");
    }

    result.events = state.take_events();
    result
}

// =============================================================================
// PHASES
// =============================================================================

/// Apply player frames and AI plans in id order.
fn apply_intent(
    state: &mut MatchState,
    inputs: &BTreeMap<CombatantId, InputFrame>,
    dt: f32,
    config: &SimConfig,
) {
    for id in state.ids() {
        let Some(c) = state.combatants.get(&id) else { continue };
        if c.is_dead() {
            continue;
        }

        match c.controller {
            Controller::Local | Controller::Remote => {
                let frame = inputs.get(&id).copied().unwrap_or_default();
                if let Some(c) = state.combatants.get_mut(&id) {
                    let _action = apply_player_intent(c, &frame, dt, &mut state.rng, &config.motion, &config.combat);
                    #[cfg(feature = "debug-tracing")]
                    if let Some(a) = _action {
                        trace!(tick = state.tick, id = id.0, action = ?a, "player action");
                    }
                }
            }
            Controller::Ai => {
                // Bots think only where a player could act too.
                if !c.state().accepts_intent() {
                    continue;
                }
                let plan = ai::plan(c, &state.combatants, dt, &mut state.rng, &config.ai);
                if let Some(c) = state.combatants.get_mut(&id) {
                    ai::apply(c, &plan);
                }
            }
        }
    }
}

/// What an attacker brings to this tick's strikes.
struct Swing {
    key: MoveKey,
    power: f32,
    direction: Vec2,
    targets: Vec<CombatantId>,
}

/// Gather the defenders an attacker may strike right now.
fn gather_swing(state: &MatchState, id: CombatantId, margin: f32) -> Option<Swing> {
    let attacker = state.combatants.get(&id)?;
    if !attacker.is_alive() || attacker.state() != BehaviorState::Attacking {
        return None;
    }
    let key = attacker.active_move?;
    let def = key.def();
    if def.phase_at(attacker.move_elapsed, attacker.stats.speed) != MovePhase::Active {
        return None;
    }

    let targets = state
        .combatants
        .values()
        .filter(|d| d.team != attacker.team && d.is_alive())
        .filter(|d| !attacker.hit_registry.contains(&d.id))
        .filter(|d| in_strike_zone(attacker, d, def, margin))
        .map(|d| d.id)
        .collect();

    Some(Swing {
        key,
        power: attacker.stats.power,
        direction: attacker.facing,
        targets,
    })
}

/// Resolve every active swing against its eligible defenders.
fn resolve_strikes(state: &mut MatchState, config: &SimConfig, result: &mut TickResult) {
    for attacker_id in state.ids() {
        let Some(swing) = gather_swing(state, attacker_id, config.combat.reach_margin) else {
            continue;
        };

        for defender_id in swing.targets {
            // A parry earlier in this loop ends the swing.
            let still_swinging = state
                .combatants
                .get(&attacker_id)
                .is_some_and(|a| a.active_move == Some(swing.key) && a.state() == BehaviorState::Attacking);
            if !still_swinging {
                break;
            }

            let Some(defender) = state.combatants.get_mut(&defender_id) else { continue };
            let strike = resolve_strike(swing.key.def(), swing.power, swing.direction, defender, &config.combat);
            let impact_at = defender.center();

            if let Some(attacker) = state.combatants.get_mut(&attacker_id) {
                attacker.hit_registry.insert(defender_id);
                if let Some(stagger) = strike.attacker_stagger {
                    attacker.stagger_for(stagger);
                }
            }

            result.effects.record(strike.outcome);
            state.push_event(CombatEvent::new(
                state.tick,
                CombatEventData::Strike {
                    attacker: attacker_id,
                    defender: defender_id,
                    move_key: swing.key,
                    outcome: strike.outcome,
                    guard_broken: strike.guard_broken,
                    damage: strike.damage,
                    position: impact_at,
                    direction: swing.direction,
                },
            ));

            if strike.killed {
                info!(tick = state.tick, victim = defender_id.0, killer = attacker_id.0, "Combatant killed");
                state.push_event(CombatEvent::new(
                    state.tick,
                    CombatEventData::Died {
                        victim: defender_id,
                        killer: Some(attacker_id),
                    },
                ));
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AiConfig;
    use crate::game::combatant::{Combatant, StatBlock};
    use crate::game::events::Outcome;
    use crate::game::state::{MatchSetup, Seat, GUEST_ID, HOST_ID};

    const DT: f32 = 1.0 / 60.0;

    /// Two Local-controlled fighters, P1 facing P2 at `gap`.
    fn face_off(gap: f32) -> MatchState {
        let mut state = MatchState::new(1);
        let a = Combatant::new(HOST_ID, Team::Blue, Controller::Local, Vec2::new(400.0, 400.0), StatBlock::BALANCED);
        let mut b = Combatant::new(GUEST_ID, Team::Red, Controller::Local, Vec2::new(400.0 + gap, 400.0), StatBlock::BALANCED);
        b.facing = Vec2::LEFT;
        state.add_combatant(a);
        state.add_combatant(b);
        state
    }

    fn no_input() -> BTreeMap<CombatantId, InputFrame> {
        BTreeMap::new()
    }

    /// Tick until the attacker's active phase has passed.
    fn run_swing(state: &mut MatchState, inputs: &BTreeMap<CombatantId, InputFrame>, config: &SimConfig) -> Vec<CombatEvent> {
        let mut events = Vec::new();
        for _ in 0..30 {
            events.extend(tick(state, inputs, DT, config).events);
        }
        events
    }

    fn strikes(events: &[CombatEvent]) -> Vec<Outcome> {
        events.iter().filter_map(CombatEvent::outcome).collect()
    }

    #[test]
    fn test_clean_hit_registers_once() {
        let config = SimConfig::default();
        let mut state = face_off(50.0);
        state.get_mut(HOST_ID).unwrap().begin_move(MoveKey::MenUchi);

        let events = run_swing(&mut state, &no_input(), &config);

        assert_eq!(strikes(&events), vec![Outcome::Hit]);
        let defender = state.get(GUEST_ID).unwrap();
        assert_eq!(defender.health(), 90.0);
        assert!(defender.position.x > 450.0, "knocked back along attack direction");
    }

    #[test]
    fn test_block_then_registry_prevents_second_hit() {
        let config = SimConfig::default();
        let mut state = face_off(50.0);
        state.get_mut(HOST_ID).unwrap().begin_move(MoveKey::MenUchi);
        {
            let d = state.get_mut(GUEST_ID).unwrap();
            d.enter_state(BehaviorState::Blocking);
        }
        let mut inputs = BTreeMap::new();
        inputs.insert(GUEST_ID, InputFrame::new().with_flags(InputFrame::FLAG_BLOCK));

        let events = run_swing(&mut state, &inputs, &config);

        assert_eq!(strikes(&events), vec![Outcome::Blocked]);
        let d = state.get(GUEST_ID).unwrap();
        assert_eq!(d.health(), 100.0);
        assert_eq!(d.state(), BehaviorState::Blocking);
        assert!(d.guard() < 1.0);
    }

    #[test]
    fn test_parry_staggers_attacker() {
        let config = SimConfig::default();
        let mut state = face_off(50.0);
        state.get_mut(HOST_ID).unwrap().begin_move(MoveKey::MenUchi);

        // Raise the guard just before the active phase (0.16s in).
        let mut events = Vec::new();
        for _ in 0..8 {
            events.extend(tick(&mut state, &no_input(), DT, &config).events);
        }
        let mut inputs = BTreeMap::new();
        inputs.insert(GUEST_ID, InputFrame::new().with_flags(InputFrame::FLAG_BLOCK));
        for _ in 0..4 {
            events.extend(tick(&mut state, &inputs, DT, &config).events);
        }

        assert_eq!(strikes(&events), vec![Outcome::Parry]);
        let attacker = state.get(HOST_ID).unwrap();
        assert_eq!(attacker.state(), BehaviorState::Staggered);
        assert_eq!(attacker.stagger, 0.8);
        assert!(attacker.active_move.is_none());
        assert_eq!(attacker.health(), 100.0);
        assert_eq!(state.get(GUEST_ID).unwrap().health(), 100.0);
    }

    #[test]
    fn test_out_of_reach_no_strike() {
        let config = SimConfig::default();
        let mut state = face_off(200.0);
        state.get_mut(HOST_ID).unwrap().begin_move(MoveKey::MenUchi);
        let events = run_swing(&mut state, &no_input(), &config);
        assert!(strikes(&events).is_empty());
    }

    #[test]
    fn test_teammates_not_struck() {
        let config = SimConfig::default();
        let mut state = face_off(300.0);
        let ally = Combatant::new(CombatantId(5), Team::Blue, Controller::Local, Vec2::new(450.0, 400.0), StatBlock::BALANCED);
        state.add_combatant(ally);
        state.get_mut(HOST_ID).unwrap().begin_move(MoveKey::MenUchi);
        let events = run_swing(&mut state, &no_input(), &config);
        assert!(strikes(&events).is_empty());
    }

    #[test]
    fn test_kill_ends_match() {
        let config = SimConfig::default();
        let mut state = face_off(50.0);
        state.get_mut(GUEST_ID).unwrap().set_health(5.0);
        state.get_mut(HOST_ID).unwrap().begin_move(MoveKey::MenUchi);

        let mut ended = None;
        for _ in 0..30 {
            let result = tick(&mut state, &no_input(), DT, &config);
            if result.match_ended {
                ended = Some(result);
                break;
            }
        }

        let result = ended.expect("match should end");
        assert_eq!(result.winner, Some(Team::Blue));
        assert!(result.events.iter().any(|e| matches!(e.data, CombatEventData::Died { victim, .. } if victim == GUEST_ID)));
        assert!(state.is_ended());

        // Further ticks are no-ops.
        let tick_before = state.tick;
        let again = tick(&mut state, &no_input(), DT, &config);
        assert!(again.match_ended);
        assert_eq!(again.winner, Some(Team::Blue));
        assert_eq!(state.tick, tick_before);
    }

    #[test]
    fn test_simultaneous_wipe_is_draw() {
        let config = SimConfig::default();
        let mut state = face_off(400.0);
        state.get_mut(HOST_ID).unwrap().kill();
        state.get_mut(GUEST_ID).unwrap().kill();
        let result = tick(&mut state, &no_input(), DT, &config);
        assert!(result.match_ended);
        assert_eq!(result.winner, None);
    }

    #[test]
    fn test_dt_clamped() {
        let config = SimConfig::default();
        let mut state = face_off(400.0);
        state.get_mut(HOST_ID).unwrap().begin_move(MoveKey::MenUchi);
        tick(&mut state, &no_input(), 5.0, &config);
        let a = state.get(HOST_ID).unwrap();
        assert!((a.move_elapsed - config.max_dt).abs() < 1e-6);

        assert_eq!(clamp_dt(f32::NAN, 0.1), 0.0);
        assert_eq!(clamp_dt(-1.0, 0.1), 0.0);
    }

    #[test]
    fn test_effect_counts_reported() {
        let config = SimConfig::default();
        let mut state = face_off(50.0);
        state.get_mut(HOST_ID).unwrap().begin_move(MoveKey::MenUchi);
        let mut total = EffectCounts::default();
        for _ in 0..30 {
            let r = tick(&mut state, &no_input(), DT, &config);
            total.hits += r.effects.hits;
            total.sparks += r.effects.sparks;
        }
        assert_eq!(total.hits, 1);
        assert_eq!(total.sparks, 8);
    }

    #[test]
    fn test_tick_determinism() {
        let config = SimConfig::default();
        let setup = MatchSetup::Skirmish { player: StatBlock::BALANCED };
        let mut s1 = MatchState::from_setup(&setup, Seat::Host, 12345, &AiConfig::default());
        let mut s2 = MatchState::from_setup(&setup, Seat::Host, 12345, &AiConfig::default());

        let mut inputs = BTreeMap::new();
        for t in 0..600u32 {
            let mut frame = InputFrame::with_movement(1.0, 0.0).aimed_at(Vec2::new(900.0, 400.0));
            if t % 40 == 0 {
                frame = frame.with_flags(InputFrame::FLAG_ATTACK);
            }
            inputs.insert(HOST_ID, frame);
            let r1 = tick(&mut s1, &inputs, DT, &config);
            let r2 = tick(&mut s2, &inputs, DT, &config);
            assert_eq!(r1.events, r2.events);
        }

        assert_eq!(s1.tick, s2.tick);
        assert_eq!(s1.compute_hash(), s2.compute_hash());
    }

    #[test]
    fn test_random_duel_replays_identically() {
        use rand::{rngs::StdRng, Rng, SeedableRng};

        let config = SimConfig::default();
        let mut s1 = MatchState::from_setup(&MatchSetup::duel(), Seat::Host, 777, &AiConfig::default());
        let mut s2 = MatchState::from_setup(&MatchSetup::duel(), Seat::Host, 777, &AiConfig::default());
        let mut input_rng = StdRng::seed_from_u64(42);

        for _ in 0..900 {
            let mut inputs = BTreeMap::new();
            for id in [HOST_ID, GUEST_ID] {
                let frame = InputFrame::with_movement(input_rng.gen_range(-1.0..1.0), input_rng.gen_range(-1.0..1.0))
                    .aimed_at(Vec2::new(input_rng.gen_range(0.0..1200.0), input_rng.gen_range(0.0..800.0)))
                    .with_flags(input_rng.gen::<u8>() & 0x3f);
                inputs.insert(id, frame);
            }
            let r1 = tick(&mut s1, &inputs, DT, &config);
            let r2 = tick(&mut s2, &inputs, DT, &config);
            assert_eq!(r1.events, r2.events);
        }
        assert_eq!(s1.compute_hash(), s2.compute_hash());
    }

    #[test]
    fn test_bots_engage_player() {
        let config = SimConfig::default();
        let setup = MatchSetup::Skirmish { player: StatBlock::BALANCED };
        let mut state = MatchState::from_setup(&setup, Seat::Host, 3, &AiConfig::default());
        let start = state.get(CombatantId(1)).unwrap().position;

        for _ in 0..120 {
            tick(&mut state, &no_input(), DT, &config);
        }

        let player = state.get(HOST_ID).unwrap().position;
        let bot = state.get(CombatantId(1)).unwrap().position;
        assert!(bot.distance(player) < start.distance(player), "bot should close in");
    }
}
