//! Peer Session
//!
//! Drives one match over a peer link. The role is fixed at construction:
//!
//! - **Authority** simulates everything (intent, AI, hit resolution) and
//!   broadcasts a full [`Snapshot`] after every tick.
//! - **Replica** overwrites its combatants from the newest snapshot, runs
//!   kinematics only, and forwards its local input every tick.
//!
//! A failed send degrades the link but never stops the match: each side keeps
//! simulating with whatever it last received.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::{ConfigError, SimConfig};
use crate::core::hash::StateHash;
use crate::game::combatant::{CombatantId, Controller, Team};
use crate::game::events::{CombatEvent, CombatEventData, EffectCounts};
use crate::game::input::InputFrame;
use crate::game::state::{MatchSetup, MatchState, Seat};
use crate::game::state_machine::advance_kinematics;
use crate::game::tick::{clamp_dt, tick};
use crate::network::inbox::Inbox;
use crate::network::protocol::{Encoding, InputMessage, PeerMessage, Snapshot};
use crate::network::transport::{LinkStatus, Transport, TransportError};

/// Network role of this peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Runs the simulation.
    Authority,
    /// Mirrors the authority.
    Replica,
}

impl Role {
    /// Human seat driven by this role.
    pub fn seat(self) -> Seat {
        match self {
            Role::Authority => Seat::Host,
            Role::Replica => Seat::Guest,
        }
    }
}

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `end()` was already called.
    #[error("Session has ended")]
    Ended,

    /// Rejected simulation config.
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),

    /// Link setup failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Configuration for a peer session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Wire encoding for outgoing messages
    pub encoding: Encoding,
    /// Match RNG seed (both peers should agree)
    pub seed: u64,
    /// Roster
    pub setup: MatchSetup,
    /// Simulation tuning
    pub sim: SimConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::Json,
            seed: 0x5EED_0F_D0E1,
            setup: MatchSetup::duel(),
            sim: SimConfig::default(),
        }
    }
}

/// What one session step did.
#[derive(Debug, Clone)]
pub struct StepReport {
    /// Match tick after the step
    pub tick: u32,
    /// Cosmetic events (authority only, plus match end on both)
    pub events: Vec<CombatEvent>,
    /// Effect tally for this step
    pub effects: EffectCounts,
    /// Match is over
    pub match_ended: bool,
    /// Winning team, `None` while playing or on a draw
    pub winner: Option<Team>,
    /// Whether a snapshot was applied this step (replica only)
    pub snapshot_applied: bool,
    /// Link health after this step's send
    pub link: LinkStatus,
    /// Digest of the synchronized state
    pub digest: StateHash,
}

/// One peer's side of a networked match.
pub struct PeerSession<T: Transport> {
    role: Role,
    config: SessionConfig,
    transport: T,
    inbox: Inbox,
    state: Option<MatchState>,
    local_id: Option<CombatantId>,
    remote_id: Option<CombatantId>,
    /// Held part of the last remote frame; reused until a newer one arrives.
    last_remote: InputFrame,
    steps: u32,
    link: LinkStatus,
}

impl<T: Transport> PeerSession<T> {
    /// Build the match for `role` on top of an established link.
    pub fn new(role: Role, transport: T, inbox: Inbox, config: SessionConfig) -> Result<Self, SessionError> {
        config.sim.validate()?;
        let state = MatchState::from_setup(&config.setup, role.seat(), config.seed, &config.sim.ai);
        let local_id = state.local_id();
        let remote_id = state
            .combatants
            .values()
            .find(|c| c.controller == Controller::Remote)
            .map(|c| c.id);

        info!(?role, combatants = state.combatants.len(), "Session created");

        Ok(Self {
            role,
            config,
            transport,
            inbox,
            state: Some(state),
            local_id,
            remote_id,
            last_remote: InputFrame::default(),
            steps: 0,
            link: LinkStatus::Connected,
        })
    }

    /// This peer's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Match state, `None` after `end()`.
    pub fn state(&self) -> Option<&MatchState> {
        self.state.as_ref()
    }

    /// The combatant this peer drives.
    pub fn local_id(&self) -> Option<CombatantId> {
        self.local_id
    }

    /// Link health as of the last step.
    pub fn link(&self) -> LinkStatus {
        self.link
    }

    /// Advance one frame with this peer's captured input.
    #[instrument(skip(self, local_input), fields(role = ?self.role))]
    pub fn step(&mut self, dt: f32, local_input: InputFrame) -> Result<StepReport, SessionError> {
        let Some(state) = self.state.as_mut() else {
            return Err(SessionError::Ended);
        };
        self.steps = self.steps.wrapping_add(1);

        let (mut report, outgoing) = match self.role {
            Role::Authority => {
                let remote = match self.inbox.take_input() {
                    Some(msg) => {
                        self.last_remote = msg.frame.held_only();
                        msg.frame
                    }
                    None => self.last_remote,
                };

                let mut inputs = BTreeMap::new();
                if let Some(id) = self.local_id {
                    inputs.insert(id, local_input);
                }
                if let Some(id) = self.remote_id {
                    inputs.insert(id, remote);
                }

                let result = tick(state, &inputs, dt, &self.config.sim);
                let report = StepReport {
                    tick: state.tick,
                    events: result.events,
                    effects: result.effects,
                    match_ended: result.match_ended,
                    winner: result.winner,
                    snapshot_applied: false,
                    link: self.link,
                    digest: state.compute_hash(),
                };
                (report, PeerMessage::Snapshot(Snapshot::capture(state)))
            }
            Role::Replica => {
                let mut snapshot_applied = false;
                if let Some(snapshot) = self.inbox.take_snapshot() {
                    let applied = snapshot.apply(state);
                    debug!(tick = snapshot.tick, applied = applied.applied, "Snapshot applied");
                    snapshot_applied = true;
                }

                let dt = clamp_dt(dt, self.config.sim.max_dt);
                let sim = &self.config.sim;
                for c in state.combatants.values_mut() {
                    advance_kinematics(c, dt, &sim.motion, &sim.arena);
                }

                let mut events = Vec::new();
                if !state.is_ended() {
                    if let Some(outcome) = state.decide() {
                        state.end(outcome);
                        info!(winner = ?outcome.winner(), "Match ended (replica view)");
                        events.push(CombatEvent::new(
                            state.tick,
                            CombatEventData::MatchEnded {
                                winner: outcome.winner(),
                                duration_ticks: state.tick,
                            },
                        ));
                    }
                }

                let report = StepReport {
                    tick: state.tick,
                    events,
                    effects: EffectCounts::default(),
                    match_ended: state.is_ended(),
                    winner: state.outcome.and_then(|o| o.winner()),
                    snapshot_applied,
                    link: self.link,
                    digest: state.compute_hash(),
                };
                let input = InputMessage {
                    tick: self.steps,
                    frame: local_input,
                };
                (report, PeerMessage::Input(input))
            }
        };

        self.link = match self.transport.send(&outgoing) {
            Ok(()) => self.transport.status(),
            Err(e) => {
                if self.link == LinkStatus::Connected {
                    warn!("Send failed, continuing locally: {}", e);
                }
                LinkStatus::Degraded
            }
        };
        report.link = self.link;
        Ok(report)
    }

    /// Tear down the link and discard all match state.
    pub fn end(&mut self) {
        if self.state.take().is_some() {
            info!(role = ?self.role, steps = self.steps, "Session ended");
        }
        self.transport.close();
        self.link = LinkStatus::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::InputFrame;
    use crate::game::state::{GUEST_ID, HOST_ID};
    use crate::network::protocol::WireFrame;
    use crate::network::transport::LoopbackTransport;

    const DT: f32 = 1.0 / 60.0;

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn sessions(encoding: Encoding) -> (PeerSession<LoopbackTransport>, PeerSession<LoopbackTransport>) {
        let (host_link, guest_link) = LoopbackTransport::pair(encoding);
        let config = SessionConfig {
            encoding,
            ..SessionConfig::default()
        };
        let host_inbox = host_link.inbox();
        let guest_inbox = guest_link.inbox();
        (
            PeerSession::new(Role::Authority, host_link, host_inbox, config.clone()).unwrap(),
            PeerSession::new(Role::Replica, guest_link, guest_inbox, config).unwrap(),
        )
    }

    /// Always fails to send.
    struct DeadLink;

    impl Transport for DeadLink {
        fn send(&mut self, _message: &PeerMessage) -> Result<(), TransportError> {
            Err(TransportError::Disconnected)
        }

        fn status(&self) -> LinkStatus {
            LinkStatus::Degraded
        }

        fn close(&mut self) {}
    }

    #[tokio::test]
    async fn test_roles_pick_seats() {
        let (host, guest) = sessions(Encoding::Json);
        assert_eq!(host.local_id(), Some(HOST_ID));
        assert_eq!(guest.local_id(), Some(GUEST_ID));
    }

    #[tokio::test]
    async fn test_replica_mirrors_authority() {
        for encoding in [Encoding::Json, Encoding::Binary] {
            let (mut host, mut guest) = sessions(encoding);

            host.step(DT, InputFrame::with_movement(1.0, 0.0)).unwrap();
            settle().await;
            let report = guest.step(0.0, InputFrame::default()).unwrap();
            assert!(report.snapshot_applied);

            // Scenario: re-serializing the replica yields the authority snapshot.
            let sent = Snapshot::capture(host.state().unwrap());
            let mirrored = Snapshot::capture(guest.state().unwrap());
            assert_eq!(
                PeerMessage::Snapshot(mirrored).to_bytes().unwrap(),
                PeerMessage::Snapshot(sent).to_bytes().unwrap()
            );
            assert_eq!(report.digest, host.state().unwrap().compute_hash());
        }
    }

    #[tokio::test]
    async fn test_remote_input_drives_guest() {
        let (mut host, mut guest) = sessions(Encoding::Binary);
        let start = host.state().unwrap().get(GUEST_ID).unwrap().position;

        guest.step(DT, InputFrame::with_movement(-1.0, 0.0)).unwrap();
        settle().await;
        for _ in 0..60 {
            host.step(DT, InputFrame::default()).unwrap();
        }

        // Held movement keeps applying after the one message.
        let moved = host.state().unwrap().get(GUEST_ID).unwrap().position;
        assert!(moved.x < start.x - 5.0, "guest should walk left: {:?} -> {:?}", start, moved);
    }

    #[tokio::test]
    async fn test_remote_attack_consumed_once() {
        let (mut host, mut guest) = sessions(Encoding::Json);
        let attack = InputFrame::default().with_flags(InputFrame::FLAG_ATTACK);
        guest.step(DT, attack).unwrap();
        settle().await;

        host.step(DT, InputFrame::default()).unwrap();
        assert!(host.state().unwrap().get(GUEST_ID).unwrap().active_move.is_some());

        // Let the swing finish; the stale frame must not start another.
        for _ in 0..120 {
            host.step(DT, InputFrame::default()).unwrap();
        }
        let p2 = host.state().unwrap().get(GUEST_ID).unwrap();
        assert!(p2.active_move.is_none());
        assert_eq!(p2.cooldown, 0.0);
    }

    #[tokio::test]
    async fn test_non_finite_remote_aim_stays_out_of_snapshots() {
        let (mut host, mut guest) = sessions(Encoding::Json);
        let frame = InputFrame::default()
            .aimed_at(crate::core::vec2::Vec2::new(f32::NAN, 400.0))
            .with_flags(InputFrame::FLAG_DASH);
        let bytes = PeerMessage::Input(InputMessage { tick: 1, frame }).to_bytes().unwrap();
        assert!(host.inbox.deliver_frame(&WireFrame::Binary(bytes)));

        for _ in 0..3 {
            host.step(DT, InputFrame::default()).unwrap();
        }
        let p2 = host.state().unwrap().get(GUEST_ID).unwrap();
        assert!(p2.facing.is_finite() && p2.velocity.is_finite() && p2.position.is_finite());

        // The replica still accepts the authority's JSON snapshots.
        settle().await;
        let report = guest.step(0.0, InputFrame::default()).unwrap();
        assert!(report.snapshot_applied);
        assert_eq!(report.digest, host.state().unwrap().compute_hash());
    }

    #[tokio::test]
    async fn test_send_failure_degrades_but_keeps_running() {
        let config = SessionConfig::default();
        let mut host = PeerSession::new(Role::Authority, DeadLink, Inbox::new(), config).unwrap();

        let first = host.step(DT, InputFrame::with_movement(0.0, 1.0)).unwrap();
        let second = host.step(DT, InputFrame::with_movement(0.0, 1.0)).unwrap();
        assert_eq!(first.link, LinkStatus::Degraded);
        assert_eq!(second.tick, 2);
        assert_eq!(host.link(), LinkStatus::Degraded);
    }

    #[tokio::test]
    async fn test_replica_without_snapshots_coasts() {
        let config = SessionConfig::default();
        let mut guest = PeerSession::new(Role::Replica, DeadLink, Inbox::new(), config).unwrap();
        let report = guest.step(DT, InputFrame::with_movement(1.0, 0.0)).unwrap();
        assert!(!report.snapshot_applied);
        assert!(!report.match_ended);
        assert_eq!(report.tick, 0);
    }

    #[tokio::test]
    async fn test_replica_decides_from_dead_flags() {
        let (mut host, mut guest) = sessions(Encoding::Binary);
        host.state.as_mut().unwrap().get_mut(HOST_ID).unwrap().kill();
        let authority = host.step(DT, InputFrame::default()).unwrap();
        assert!(authority.match_ended);
        assert_eq!(authority.winner, Some(Team::Red));

        settle().await;
        let replica = guest.step(DT, InputFrame::default()).unwrap();
        assert!(replica.match_ended);
        assert_eq!(replica.winner, Some(Team::Red));
        assert!(replica
            .events
            .iter()
            .any(|e| matches!(e.data, CombatEventData::MatchEnded { .. })));
    }

    #[tokio::test]
    async fn test_end_discards_state() {
        let (mut host, _guest) = sessions(Encoding::Json);
        host.end();
        assert!(host.state().is_none());
        assert_eq!(host.link(), LinkStatus::Closed);
        assert!(matches!(host.step(DT, InputFrame::default()), Err(SessionError::Ended)));
    }
}
