//! Move Catalog
//!
//! Immutable registry of attack definitions. Moves are addressed by
//! [`MoveKey`], which is what travels over the wire; reordering or
//! extending the catalog never changes what an existing key means.

use serde::{Serialize, Deserialize};

use crate::game::combatant::Stance;

// =============================================================================
// MOVE TYPES
// =============================================================================

/// Stable identifier of a catalog entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKey {
    /// Straight cut to the head.
    MenUchi,
    /// Thrust.
    Tsuki,
    /// High diagonal overhead cut.
    JodanKesa,
    /// Sweeping low cut.
    LowSweep,
    /// Guard-breaking push kick.
    FrontKick,
}

/// Stance a move may be started from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StanceReq {
    /// High stance only.
    High,
    /// Middle stance only.
    Mid,
    /// Low stance only.
    Low,
    /// Any stance.
    Any,
}

impl StanceReq {
    /// Whether a combatant in `stance` satisfies this requirement.
    pub fn allows(self, stance: Stance) -> bool {
        match self {
            StanceReq::Any => true,
            StanceReq::High => stance == Stance::High,
            StanceReq::Mid => stance == Stance::Mid,
            StanceReq::Low => stance == Stance::Low,
        }
    }

    /// The concrete stance this requirement pins, if any.
    pub fn stance(self) -> Option<Stance> {
        match self {
            StanceReq::High => Some(Stance::High),
            StanceReq::Mid => Some(Stance::Mid),
            StanceReq::Low => Some(Stance::Low),
            StanceReq::Any => None,
        }
    }
}

/// Animation family. Only the pose/render side reads this.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveStyle {
    /// Horizontal or diagonal slash.
    Slash,
    /// Straight thrust.
    Thrust,
    /// Overhead chop.
    Overhead,
    /// Low sweep.
    Low,
    /// Kick.
    Kick,
}

/// Which part of an attack an elapsed time falls in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MovePhase {
    /// Telegraph, cannot hit.
    Windup,
    /// Hits register.
    Active,
    /// Tail of the swing, cannot hit.
    Recovery,
}

/// One attack definition.
#[derive(Clone, Debug, PartialEq)]
pub struct MoveDef {
    /// Display name.
    pub name: &'static str,
    /// Stance the move is started from.
    pub required: StanceReq,
    /// Total duration at speed 1.0 (seconds).
    pub total: f32,
    /// Windup duration.
    pub windup: f32,
    /// Active (hitting) duration.
    pub active: f32,
    /// Recovery duration; also the cooldown after the move.
    pub recover: f32,
    /// Reach in arena units.
    pub reach: f32,
    /// Angular tolerance around facing (radians).
    pub arc: f32,
    /// Health removed on a clean hit, before the power stat.
    pub damage: f32,
    /// Guard removed when blocked, in [0, 1].
    pub guard_break: f32,
    /// Extra knockback coefficient.
    pub knock: f32,
    /// Animation family.
    pub style: MoveStyle,
    /// Height the strike lands at (cosmetic).
    pub attack_height: Stance,
    /// Kicks are only thrown on the kick modifier.
    pub is_kick: bool,
}

// =============================================================================
// CATALOG
// =============================================================================

static MEN_UCHI: MoveDef = MoveDef {
    name: "Men Uchi",
    required: StanceReq::Mid,
    total: 0.52,
    windup: 0.16,
    active: 0.16,
    recover: 0.20,
    reach: 92.0,
    arc: 0.92,
    damage: 10.0,
    guard_break: 0.06,
    knock: 0.02,
    style: MoveStyle::Slash,
    attack_height: Stance::Mid,
    is_kick: false,
};

static TSUKI: MoveDef = MoveDef {
    name: "Tsuki",
    required: StanceReq::Mid,
    total: 0.62,
    windup: 0.22,
    active: 0.14,
    recover: 0.26,
    reach: 112.0,
    arc: 0.36,
    damage: 13.0,
    guard_break: 0.10,
    knock: 0.06,
    style: MoveStyle::Thrust,
    attack_height: Stance::Mid,
    is_kick: false,
};

static JODAN_KESA: MoveDef = MoveDef {
    name: "Jodan Kesa",
    required: StanceReq::High,
    total: 0.84,
    windup: 0.34,
    active: 0.18,
    recover: 0.32,
    reach: 102.0,
    arc: 0.70,
    damage: 20.0,
    guard_break: 0.22,
    knock: 0.12,
    style: MoveStyle::Overhead,
    attack_height: Stance::High,
    is_kick: false,
};

static LOW_SWEEP: MoveDef = MoveDef {
    name: "Low Sweep",
    required: StanceReq::Low,
    total: 0.70,
    windup: 0.26,
    active: 0.18,
    recover: 0.26,
    reach: 88.0,
    arc: 0.85,
    damage: 11.0,
    guard_break: 0.35,
    knock: 0.12,
    style: MoveStyle::Low,
    attack_height: Stance::Low,
    is_kick: false,
};

static FRONT_KICK: MoveDef = MoveDef {
    name: "Front Kick",
    required: StanceReq::Any,
    total: 0.52,
    windup: 0.18,
    active: 0.14,
    recover: 0.20,
    reach: 66.0,
    arc: 0.55,
    damage: 6.0,
    guard_break: 0.75,
    knock: 0.42,
    style: MoveStyle::Kick,
    attack_height: Stance::Low,
    is_kick: true,
};

impl MoveKey {
    /// Every key in the catalog.
    pub const ALL: [MoveKey; 5] = [
        MoveKey::MenUchi,
        MoveKey::Tsuki,
        MoveKey::JodanKesa,
        MoveKey::LowSweep,
        MoveKey::FrontKick,
    ];

    /// Look up the definition.
    pub fn def(self) -> &'static MoveDef {
        match self {
            MoveKey::MenUchi => &MEN_UCHI,
            MoveKey::Tsuki => &TSUKI,
            MoveKey::JodanKesa => &JODAN_KESA,
            MoveKey::LowSweep => &LOW_SWEEP,
            MoveKey::FrontKick => &FRONT_KICK,
        }
    }

    /// Wire name of this key.
    pub fn as_str(self) -> &'static str {
        match self {
            MoveKey::MenUchi => "men_uchi",
            MoveKey::Tsuki => "tsuki",
            MoveKey::JodanKesa => "jodan_kesa",
            MoveKey::LowSweep => "low_sweep",
            MoveKey::FrontKick => "front_kick",
        }
    }

    /// Parse a wire name.
    pub fn from_name(name: &str) -> Option<MoveKey> {
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }

    /// Non-kick moves that can be started from `stance`.
    pub fn usable_from(stance: Stance) -> Vec<MoveKey> {
        Self::ALL
            .iter()
            .copied()
            .filter(|k| !k.def().is_kick && k.def().usable_from(stance))
            .collect()
    }
}

impl MoveDef {
    /// Whether the move can be started from `stance`.
    #[inline]
    pub fn usable_from(&self, stance: Stance) -> bool {
        self.required.allows(stance)
    }

    /// Duration of the attacking state for a given speed stat.
    #[inline]
    pub fn duration(&self, speed: f32) -> f32 {
        self.total / speed
    }

    /// Phase at `elapsed` seconds into the move, scaled by `speed`.
    ///
    /// The active phase includes both of its end points.
    pub fn phase_at(&self, elapsed: f32, speed: f32) -> MovePhase {
        let start = self.windup / speed;
        let end = (self.windup + self.active) / speed;
        if elapsed < start {
            MovePhase::Windup
        } else if elapsed <= end {
            MovePhase::Active
        } else {
            MovePhase::Recovery
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_timings_consistent() {
        for key in MoveKey::ALL {
            let m = key.def();
            assert!(m.total > 0.0 && m.windup > 0.0 && m.active > 0.0 && m.recover > 0.0, "{}", m.name);
            assert!(
                (m.windup + m.active + m.recover - m.total).abs() < 1e-5,
                "{} phases do not sum to total",
                m.name
            );
            assert!((0.0..=1.0).contains(&m.guard_break));
        }
    }

    #[test]
    fn test_keys_roundtrip_by_name() {
        for key in MoveKey::ALL {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
            let back: MoveKey = serde_json::from_str(&json).unwrap();
            assert_eq!(back, key);
            assert_eq!(MoveKey::from_name(key.as_str()), Some(key));
        }
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(MoveKey::from_name("none"), None);
        assert_eq!(MoveKey::from_name("Men Uchi"), None);
    }

    #[test]
    fn test_phase_boundaries() {
        let m = MoveKey::MenUchi.def();
        assert_eq!(m.phase_at(0.0, 1.0), MovePhase::Windup);
        assert_eq!(m.phase_at(0.159, 1.0), MovePhase::Windup);
        assert_eq!(m.phase_at(0.16, 1.0), MovePhase::Active);
        assert_eq!(m.phase_at(0.32, 1.0), MovePhase::Active);
        assert_eq!(m.phase_at(0.33, 1.0), MovePhase::Recovery);
    }

    #[test]
    fn test_phase_speed_scaled() {
        let m = MoveKey::MenUchi.def();
        // At double speed the active phase is [0.08, 0.16].
        assert_eq!(m.phase_at(0.1, 2.0), MovePhase::Active);
        assert_eq!(m.phase_at(0.1, 1.0), MovePhase::Windup);
        assert!((m.duration(2.0) - 0.26).abs() < 1e-6);
    }

    #[test]
    fn test_usable_from_stance() {
        assert_eq!(MoveKey::usable_from(Stance::Mid), vec![MoveKey::MenUchi, MoveKey::Tsuki]);
        assert_eq!(MoveKey::usable_from(Stance::High), vec![MoveKey::JodanKesa]);
        assert_eq!(MoveKey::usable_from(Stance::Low), vec![MoveKey::LowSweep]);
    }
}
