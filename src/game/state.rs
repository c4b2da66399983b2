//! Match State
//!
//! The explicit simulation context: one arena of combatants, the match RNG
//! and the match phase. A single driver owns it and passes it by reference
//! to every subsystem. Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::config::AiConfig;
use crate::core::hash::{StateHash, compute_snapshot_hash};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::combatant::{Combatant, CombatantId, Controller, StatBlock, Team};
use crate::game::events::CombatEvent;

/// Id of the first human seat (Blue).
pub const HOST_ID: CombatantId = CombatantId(0);

/// Id of the second seat (Red): the guest in a duel, the first bot otherwise.
pub const GUEST_ID: CombatantId = CombatantId(1);

// =============================================================================
// MATCH SETUP
// =============================================================================

/// Which human seat this peer drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    /// Blue player one.
    Host,
    /// Red player two.
    Guest,
}

/// Roster and spawn layout of a match.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSetup {
    /// One human (Blue) against two bots (Red).
    Skirmish {
        /// Player stat preset
        player: StatBlock,
    },
    /// Two humans, one per peer.
    Duel {
        /// Blue (host) stat preset
        host: StatBlock,
        /// Red (guest) stat preset
        guest: StatBlock,
    },
}

impl MatchSetup {
    /// Ids of the two skirmish bots.
    pub const BOT_IDS: [CombatantId; 2] = [GUEST_ID, CombatantId(2)];

    /// Stats of the two skirmish bots.
    pub const BOT_STATS: [StatBlock; 2] = [StatBlock::new(0.9, 1.0), StatBlock::new(1.1, 0.8)];

    /// Balanced duel.
    pub fn duel() -> Self {
        MatchSetup::Duel {
            host: StatBlock::BALANCED,
            guest: StatBlock::BALANCED,
        }
    }
}

// =============================================================================
// MATCH PHASE
// =============================================================================

/// Current phase of the match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchPhase {
    /// Active gameplay
    #[default]
    Playing,
    /// A side was wiped out
    Ended,
}

/// How a finished match was decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// The named team has the only survivors.
    Victory(Team),
    /// Both sides fell on the same tick.
    Draw,
}

impl MatchOutcome {
    /// Winning team, `None` for a draw.
    pub fn winner(self) -> Option<Team> {
        match self {
            MatchOutcome::Victory(team) => Some(team),
            MatchOutcome::Draw => None,
        }
    }
}

// =============================================================================
// MATCH STATE
// =============================================================================

/// Complete state of a match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchState {
    /// Ticks simulated (authority) or last snapshot tick (replica)
    pub tick: u32,

    /// Current match phase
    pub phase: MatchPhase,

    /// RNG seed
    pub rng_seed: u64,

    /// Match RNG; every random draw in resolution-relevant logic comes from here
    #[serde(skip)]
    pub rng: DeterministicRng,

    /// Arena of combatants (BTreeMap for deterministic iteration)
    pub combatants: BTreeMap<CombatantId, Combatant>,

    /// Set once the match ends
    pub outcome: Option<MatchOutcome>,

    /// Events generated this tick (cleared each tick)
    #[serde(skip)]
    pub pending_events: Vec<CombatEvent>,
}

impl MatchState {
    /// Create an empty match.
    pub fn new(rng_seed: u64) -> Self {
        Self {
            tick: 0,
            phase: MatchPhase::Playing,
            rng_seed,
            rng: DeterministicRng::new(rng_seed),
            combatants: BTreeMap::new(),
            outcome: None,
            pending_events: Vec::new(),
        }
    }

    /// Create a match from a setup, seen from `seat`.
    ///
    /// The combatant sitting in `seat` is Local, the other human seat is
    /// Remote, and bots are AI with an aggression drawn from the match RNG.
    pub fn from_setup(setup: &MatchSetup, seat: Seat, rng_seed: u64, ai: &AiConfig) -> Self {
        let mut state = Self::new(rng_seed);
        let human = |s: Seat| if s == seat { Controller::Local } else { Controller::Remote };

        match *setup {
            MatchSetup::Skirmish { player } => {
                state.add_combatant(Combatant::new(
                    HOST_ID,
                    Team::Blue,
                    human(Seat::Host),
                    Vec2::new(200.0, 400.0),
                    player,
                ));
                let spawns = [Vec2::new(900.0, 300.0), Vec2::new(900.0, 500.0)];
                let bots = MatchSetup::BOT_IDS.into_iter().zip(spawns).zip(MatchSetup::BOT_STATS);
                for ((id, pos), stats) in bots {
                    let mut bot = Combatant::new(
                        id,
                        Team::Red,
                        Controller::Ai,
                        pos,
                        stats,
                    );
                    bot.facing = Vec2::LEFT;
                    bot.ai_aggression = state.rng.next_range(ai.aggression.0, ai.aggression.1);
                    state.add_combatant(bot);
                }
            }
            MatchSetup::Duel { host, guest } => {
                state.add_combatant(Combatant::new(
                    HOST_ID,
                    Team::Blue,
                    human(Seat::Host),
                    Vec2::new(300.0, 400.0),
                    host,
                ));
                let mut p2 = Combatant::new(
                    GUEST_ID,
                    Team::Red,
                    human(Seat::Guest),
                    Vec2::new(900.0, 400.0),
                    guest,
                );
                p2.facing = Vec2::LEFT;
                state.add_combatant(p2);
            }
        }
        state
    }

    /// Insert a combatant under its id.
    pub fn add_combatant(&mut self, combatant: Combatant) {
        self.combatants.insert(combatant.id, combatant);
    }

    /// Get a combatant by id.
    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    /// Get a combatant mutably by id.
    pub fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    /// Ids in resolution order.
    pub fn ids(&self) -> Vec<CombatantId> {
        self.combatants.keys().copied().collect()
    }

    /// Living combatants on `team`.
    pub fn alive_count(&self, team: Team) -> usize {
        self.combatants
            .values()
            .filter(|c| c.team == team && c.is_alive())
            .count()
    }

    /// The combatant this peer drives, if any.
    pub fn local_id(&self) -> Option<CombatantId> {
        self.combatants
            .values()
            .find(|c| c.controller == Controller::Local)
            .map(|c| c.id)
    }

    /// Decide the match from dead flags alone.
    ///
    /// A side with no living combatants loses; both empty is a draw.
    pub fn decide(&self) -> Option<MatchOutcome> {
        let blue = self.alive_count(Team::Blue);
        let red = self.alive_count(Team::Red);
        match (blue, red) {
            (0, 0) => Some(MatchOutcome::Draw),
            (0, _) => Some(MatchOutcome::Victory(Team::Red)),
            (_, 0) => Some(MatchOutcome::Victory(Team::Blue)),
            _ => None,
        }
    }

    /// Move to the Ended phase.
    pub fn end(&mut self, outcome: MatchOutcome) {
        self.phase = MatchPhase::Ended;
        self.outcome = Some(outcome);
    }

    /// Check if match has ended.
    pub fn is_ended(&self) -> bool {
        matches!(self.phase, MatchPhase::Ended)
    }

    /// Digest of every synchronized field, in id order.
    pub fn compute_hash(&self) -> StateHash {
        compute_snapshot_hash(self.tick, |hasher| {
            for c in self.combatants.values() {
                c.hash_into(hasher);
            }
        })
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a combat event.
    pub fn push_event(&mut self, event: CombatEvent) {
        self.pending_events.push(event);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skirmish_roster() {
        let state = MatchState::from_setup(
            &MatchSetup::Skirmish { player: StatBlock::POWER },
            Seat::Host,
            7,
            &AiConfig::default(),
        );
        assert_eq!(state.combatants.len(), 3);
        assert_eq!(state.local_id(), Some(HOST_ID));
        assert_eq!(state.get(HOST_ID).map(|c| c.stats), Some(StatBlock::POWER));

        for id in MatchSetup::BOT_IDS {
            let bot = &state.combatants[&id];
            assert_eq!(bot.controller, Controller::Ai);
            assert_eq!(bot.team, Team::Red);
            assert!((0.5..1.0).contains(&bot.ai_aggression));
        }
    }

    #[test]
    fn test_duel_controllers_follow_seat() {
        let setup = MatchSetup::duel();
        let host = MatchState::from_setup(&setup, Seat::Host, 1, &AiConfig::default());
        let guest = MatchState::from_setup(&setup, Seat::Guest, 1, &AiConfig::default());

        assert_eq!(host.combatants[&HOST_ID].controller, Controller::Local);
        assert_eq!(host.combatants[&GUEST_ID].controller, Controller::Remote);
        assert_eq!(guest.combatants[&HOST_ID].controller, Controller::Remote);
        assert_eq!(guest.combatants[&GUEST_ID].controller, Controller::Local);
        assert_eq!(host.compute_hash(), guest.compute_hash());
    }

    #[test]
    fn test_decide() {
        let mut state = MatchState::from_setup(&MatchSetup::duel(), Seat::Host, 1, &AiConfig::default());
        assert_eq!(state.decide(), None);

        state.get_mut(GUEST_ID).unwrap().kill();
        assert_eq!(state.decide(), Some(MatchOutcome::Victory(Team::Blue)));

        state.get_mut(HOST_ID).unwrap().kill();
        assert_eq!(state.decide(), Some(MatchOutcome::Draw));
        assert_eq!(MatchOutcome::Draw.winner(), None);
    }

    #[test]
    fn test_hash_tracks_synced_fields() {
        let mut state = MatchState::from_setup(&MatchSetup::duel(), Seat::Host, 1, &AiConfig::default());
        let before = state.compute_hash();

        state.get_mut(HOST_ID).unwrap().ai_timer = 3.0;
        assert_eq!(state.compute_hash(), before, "AI bookkeeping is not synchronized");

        state.get_mut(HOST_ID).unwrap().position.x += 1.0;
        assert_ne!(state.compute_hash(), before);
    }

    #[test]
    fn test_seeded_roster_deterministic() {
        let setup = MatchSetup::Skirmish { player: StatBlock::BALANCED };
        let a = MatchState::from_setup(&setup, Seat::Host, 99, &AiConfig::default());
        let b = MatchState::from_setup(&setup, Seat::Host, 99, &AiConfig::default());
        for (ca, cb) in a.combatants.values().zip(b.combatants.values()) {
            assert_eq!(ca.ai_aggression, cb.ai_aggression);
        }
    }
}
