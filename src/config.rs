//! Simulation Configuration
//!
//! Every tuned constant of the combat simulation lives here, grouped by the
//! subsystem that reads it. Defaults reproduce the shipped game feel; any
//! subset can be overridden from JSON (missing keys keep their defaults).

use std::path::Path;
use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for [`SimConfig`].
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is outside its allowed range.
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field path.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Upper bound on the frame delta fed into one tick (seconds).
    pub max_dt: f32,
    /// Arena geometry.
    pub arena: ArenaConfig,
    /// Kinematics and state timings.
    pub motion: MotionConfig,
    /// Hit resolution constants.
    pub combat: CombatConfig,
    /// AI policy tunables.
    pub ai: AiConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_dt: crate::MAX_FRAME_DT,
            arena: ArenaConfig::default(),
            motion: MotionConfig::default(),
            combat: CombatConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_dt > 0.0) {
            return Err(ConfigError::Invalid { field: "max_dt", reason: "must be positive" });
        }
        if self.arena.min.x >= self.arena.max.x || self.arena.min.y >= self.arena.max.y {
            return Err(ConfigError::Invalid { field: "arena", reason: "min must be below max" });
        }
        if !(0.0..=1.0).contains(&self.motion.drag) {
            return Err(ConfigError::Invalid { field: "motion.drag", reason: "must be in [0, 1]" });
        }
        if self.ai.decision_interval.0 > self.ai.decision_interval.1
            || self.ai.block_hold.0 > self.ai.block_hold.1
            || self.ai.aggression.0 > self.ai.aggression.1
        {
            return Err(ConfigError::Invalid { field: "ai", reason: "range start exceeds end" });
        }
        Ok(())
    }
}

/// Playable rectangle. Positions are clamped into `[min, max]` every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Top-left corner of the walkable area.
    pub min: Vec2,
    /// Bottom-right corner of the walkable area.
    pub max: Vec2,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        // 1200x700 field, 40px wall margin, 150px sky band.
        Self {
            min: Vec2::new(40.0, 150.0),
            max: Vec2::new(1160.0, 660.0),
        }
    }
}

/// Kinematics and fixed state durations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Velocity multiplier per 1/60 s (`v *= drag^(dt*60)`).
    pub drag: f32,
    /// Player movement acceleration before the speed stat (units/s²).
    pub move_accel: f32,
    /// Dash speed along facing.
    pub dash_speed: f32,
    /// Dash duration (seconds).
    pub dash_time: f32,
    /// Cooldown applied when a dash starts.
    pub dash_cooldown: f32,
    /// Recovering state duration.
    pub recover_time: f32,
    /// Per-tick velocity multiplier while Blocking.
    pub block_drag: f32,
    /// Guard regeneration per second.
    pub guard_regen: f32,
    /// Cosmetic guard-lift decay per second.
    pub guard_lift_decay: f32,
    /// Staggered lasts `stagger_base + stagger * stagger_scale` seconds.
    pub stagger_base: f32,
    /// See `stagger_base`.
    pub stagger_scale: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            drag: 0.86,
            move_accel: 280.0,
            dash_speed: 900.0,
            dash_time: 0.2,
            dash_cooldown: 0.5,
            recover_time: 0.15,
            block_drag: 0.5,
            guard_regen: 0.15,
            guard_lift_decay: 2.0,
            stagger_base: 0.2,
            stagger_scale: 0.4,
        }
    }
}

/// Hit resolution constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Added to a move's reach when testing range.
    pub reach_margin: f32,
    /// Base knockback for clean hits, scaled by `1 + move.knock`.
    pub hit_knockback: f32,
    /// Knockback impulse on a blocked strike.
    pub block_knockback: f32,
    /// Guard restored by a successful parry.
    pub parry_guard_bonus: f32,
    /// Parry window opened by a player-held block.
    pub player_parry_window: f32,
    /// Stagger value applied to a parried attacker.
    pub parry_stagger: f32,
    /// Stagger value recorded on a blocked defender.
    pub block_stagger: f32,
    /// Stagger value of a guard break.
    pub guard_break_stagger: f32,
    /// Stagger value of a clean hit.
    pub hit_stagger: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            reach_margin: 30.0,
            hit_knockback: 300.0,
            block_knockback: 100.0,
            parry_guard_bonus: 0.2,
            player_parry_window: 0.15,
            parry_stagger: 0.8,
            block_stagger: 0.2,
            guard_break_stagger: 1.0,
            hit_stagger: 0.4,
        }
    }
}

/// AI policy tunables. Ranges are half-open `(min, max)` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Allies closer than this push apart.
    pub separation_distance: f32,
    /// Push per second per unit of overlap.
    pub separation_strength: f32,
    /// Preferred distance to the target.
    pub desired_distance: f32,
    /// Dead band around `desired_distance`.
    pub distance_margin: f32,
    /// Acceleration when approaching or retreating.
    pub approach_accel: f32,
    /// Acceleration when circling.
    pub strafe_accel: f32,
    /// Facing is only updated beyond this distance.
    pub face_min_distance: f32,
    /// Attacks are only attempted within this distance.
    pub attack_range: f32,
    /// Per-decision attack probability, multiplied by aggression.
    pub attack_chance: f32,
    /// Delay after an attack before the next decision.
    pub decision_interval: (f32, f32),
    /// Per-decision probability of a timed block.
    pub block_chance: f32,
    /// How long a timed block is held.
    pub block_hold: (f32, f32),
    /// Parry window opened by an AI block.
    pub parry_window: f32,
    /// Delay after a block before the next decision.
    pub block_decision_delay: f32,
    /// Aggression assigned at creation.
    pub aggression: (f32, f32),
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            separation_distance: 100.0,
            separation_strength: 20.0,
            desired_distance: 110.0,
            distance_margin: 20.0,
            approach_accel: 200.0,
            strafe_accel: 100.0,
            face_min_distance: 10.0,
            attack_range: 130.0,
            attack_chance: 0.05,
            decision_interval: (0.5, 2.0),
            block_chance: 0.02,
            block_hold: (0.2, 0.7),
            parry_window: 0.1,
            block_decision_delay: 1.0,
            aggression: (0.5, 1.0),
        }
    }
}
