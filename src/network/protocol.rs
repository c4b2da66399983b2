//! Protocol Messages
//!
//! Wire format between the two peers. The replica sends an [`InputMessage`]
//! every tick; the authority answers with a full [`Snapshot`] every tick.
//! JSON (text frames) is the debug encoding, bincode (binary frames) the
//! compact one. Both reproduce f32 values bit for bit.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::core::vec2::Vec2;
use crate::game::combatant::{BehaviorState, Combatant, CombatantId, Stance};
use crate::game::input::InputFrame;
use crate::game::moves::MoveKey;
use crate::game::state::MatchState;

/// Encoding / decoding failures.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Text frame was not a valid JSON message.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary frame was not a valid bincode message.
    #[error("Binary codec error: {0}")]
    Binary(#[from] bincode::Error),
}

/// Wire encoding selected for outgoing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Human-readable, sent as text frames.
    #[default]
    Json,
    /// bincode, sent as binary frames.
    Binary,
}

/// One encoded message, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    /// JSON text.
    Text(String),
    /// bincode bytes.
    Binary(Vec<u8>),
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Everything that travels between the peers.
///
/// Externally tagged so the same enum works with bincode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerMessage {
    /// Replica to authority.
    Input(InputMessage),
    /// Authority to replica.
    Snapshot(Snapshot),
}

/// Local input of the replica for one of its ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputMessage {
    /// Replica step counter (informational)
    pub tick: u32,
    /// The frame
    pub frame: InputFrame,
}

/// Full synchronized state of every combatant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Authority tick the snapshot was taken after
    pub tick: u32,
    /// One entry per combatant, in id order
    pub combatants: Vec<SnapshotEntry>,
}

/// Active move on the wire: a catalog key name or `"none"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRef(pub Option<MoveKey>);

impl Serialize for MoveRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.map_or("none", MoveKey::as_str))
    }
}

impl<'de> Deserialize<'de> for MoveRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        if name == "none" {
            return Ok(MoveRef(None));
        }
        MoveKey::from_name(&name)
            .map(|k| MoveRef(Some(k)))
            .ok_or_else(|| serde::de::Error::custom(format!("unknown move key {name:?}")))
    }
}

/// Wire form of one combatant. Every field may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Arena key
    pub id: CombatantId,
    /// Ground position
    #[serde(default)]
    pub position: Option<Vec2>,
    /// Velocity
    #[serde(default)]
    pub velocity: Option<Vec2>,
    /// Health
    #[serde(default)]
    pub health: Option<f32>,
    /// Guard integrity
    #[serde(default)]
    pub guard: Option<f32>,
    /// Behavioral state
    #[serde(default)]
    pub state: Option<BehaviorState>,
    /// Seconds in state
    #[serde(default)]
    pub state_time: Option<f32>,
    /// Facing
    #[serde(default)]
    pub facing: Option<Vec2>,
    /// Stance
    #[serde(default)]
    pub stance: Option<Stance>,
    /// Active move or `"none"`
    #[serde(default)]
    pub active_move: Option<MoveRef>,
    /// Seconds into the active move
    #[serde(default)]
    pub move_elapsed: Option<f32>,
    /// Action cooldown
    #[serde(default)]
    pub cooldown: Option<f32>,
    /// Terminal flag
    #[serde(default)]
    pub dead: Option<bool>,
}

/// Validated snapshot of one combatant: every synchronized field present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatantSnapshot {
    /// Arena key
    pub id: CombatantId,
    /// Ground position
    pub position: Vec2,
    /// Velocity
    pub velocity: Vec2,
    /// Health
    pub health: f32,
    /// Guard integrity
    pub guard: f32,
    /// Behavioral state
    pub state: BehaviorState,
    /// Seconds in state
    pub state_time: f32,
    /// Facing
    pub facing: Vec2,
    /// Stance
    pub stance: Stance,
    /// Active move
    pub active_move: Option<MoveKey>,
    /// Seconds into the active move
    pub move_elapsed: f32,
    /// Action cooldown
    pub cooldown: f32,
    /// Terminal flag
    pub dead: bool,
}

impl CombatantSnapshot {
    /// True if every float field is finite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.velocity.is_finite()
            && self.facing.is_finite()
            && [self.health, self.guard, self.state_time, self.move_elapsed, self.cooldown]
                .iter()
                .all(|v| v.is_finite())
    }

    /// Read the synchronized fields of a combatant.
    pub fn capture(c: &Combatant) -> Self {
        Self {
            id: c.id,
            position: c.position,
            velocity: c.velocity,
            health: c.health(),
            guard: c.guard(),
            state: c.state(),
            state_time: c.state_time,
            facing: c.facing,
            stance: c.stance,
            active_move: c.active_move,
            move_elapsed: c.move_elapsed,
            cooldown: c.cooldown,
            dead: c.is_dead(),
        }
    }

    /// Overwrite the synchronized fields of `c`. Never revives.
    pub fn apply_to(&self, c: &mut Combatant) {
        c.overwrite_synced(
            self.position,
            self.velocity,
            self.health,
            self.guard,
            self.state,
            self.state_time,
            self.facing,
            self.stance,
            self.active_move,
            self.move_elapsed,
            self.cooldown,
            self.dead,
        );
    }
}

impl From<CombatantSnapshot> for SnapshotEntry {
    fn from(s: CombatantSnapshot) -> Self {
        Self {
            id: s.id,
            position: Some(s.position),
            velocity: Some(s.velocity),
            health: Some(s.health),
            guard: Some(s.guard),
            state: Some(s.state),
            state_time: Some(s.state_time),
            facing: Some(s.facing),
            stance: Some(s.stance),
            active_move: Some(MoveRef(s.active_move)),
            move_elapsed: Some(s.move_elapsed),
            cooldown: Some(s.cooldown),
            dead: Some(s.dead),
        }
    }
}

impl SnapshotEntry {
    /// The validated form, or `None` if any field is missing.
    ///
    /// Entries carrying NaN or infinite values are treated as incomplete.
    pub fn complete(&self) -> Option<CombatantSnapshot> {
        let snap = CombatantSnapshot {
            id: self.id,
            position: self.position?,
            velocity: self.velocity?,
            health: self.health?,
            guard: self.guard?,
            state: self.state?,
            state_time: self.state_time?,
            facing: self.facing?,
            stance: self.stance?,
            active_move: self.active_move?.0,
            move_elapsed: self.move_elapsed?,
            cooldown: self.cooldown?,
            dead: self.dead?,
        };
        snap.is_finite().then_some(snap)
    }
}

/// What applying a snapshot did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Combatants overwritten
    pub applied: usize,
    /// Entries skipped for missing or non-finite fields
    pub incomplete: usize,
    /// Entries naming an id this match does not have
    pub unknown: usize,
}

impl Snapshot {
    /// Capture every combatant of a match.
    pub fn capture(state: &MatchState) -> Self {
        Self {
            tick: state.tick,
            combatants: state
                .combatants
                .values()
                .map(|c| CombatantSnapshot::capture(c).into())
                .collect(),
        }
    }

    /// Overwrite the covered combatants of `state` wholesale.
    ///
    /// Incomplete entries leave their combatant untouched; unknown ids are
    /// ignored. The newest snapshot always wins: there is no sequence check.
    pub fn apply(&self, state: &mut MatchState) -> ApplyReport {
        let mut report = ApplyReport::default();
        for entry in &self.combatants {
            let Some(c) = state.combatants.get_mut(&entry.id) else {
                report.unknown += 1;
                continue;
            };
            match entry.complete() {
                Some(snap) => {
                    snap.apply_to(c);
                    report.applied += 1;
                }
                None => {
                    debug!(tick = self.tick, id = entry.id.0, "Snapshot entry incomplete or non-finite, keeping last good state");
                    report.incomplete += 1;
                }
            }
        }
        state.tick = self.tick;
        report
    }
}

// =============================================================================
// CODECS
// =============================================================================

impl PeerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        Ok(bincode::deserialize(data)?)
    }

    /// Encode for a transport.
    pub fn encode(&self, encoding: Encoding) -> Result<WireFrame, ProtocolError> {
        match encoding {
            Encoding::Json => self.to_json().map(WireFrame::Text),
            Encoding::Binary => self.to_bytes().map(WireFrame::Binary),
        }
    }

    /// Decode a frame; the frame kind picks the codec.
    pub fn decode(frame: &WireFrame) -> Result<Self, ProtocolError> {
        match frame {
            WireFrame::Text(text) => Self::from_json(text),
            WireFrame::Binary(bytes) => Self::from_bytes(bytes),
        }
    }

    /// Message kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMessage::Input(_) => "input",
            PeerMessage::Snapshot(_) => "snapshot",
        }
    }
}

impl fmt::Display for PeerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerMessage::Input(m) => write!(f, "input(tick={})", m.tick),
            PeerMessage::Snapshot(s) => write!(f, "snapshot(tick={}, n={})", s.tick, s.combatants.len()),
        }
    }
}
