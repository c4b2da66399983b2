//! State Hashing for Desync Detection
//!
//! Provides deterministic SHA-256 digests of synchronized combat state so
//! both peers can log and compare what they believe the match looks like.
//! Floats are hashed by their bit patterns, so two digests match only when
//! every synchronized value is bitwise equal.

use sha2::{Sha256, Digest};
use super::vec2::Vec2;

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for combat state.
///
/// Wraps SHA-256 with helpers for the simulation's value types.
/// Order of updates is critical for determinism.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for snapshot contents.
    pub fn for_snapshot() -> Self {
        Self::new(b"RONIN_SNAPSHOT_V1")
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an f32 value (bit pattern, little-endian).
    #[inline]
    pub fn update_f32(&mut self, value: f32) {
        self.update_u32(value.to_bits());
    }

    /// Update with a Vec2.
    #[inline]
    pub fn update_vec2(&mut self, value: Vec2) {
        self.update_f32(value.x);
        self.update_f32(value.y);
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Update with a string tag (length-prefixed).
    #[inline]
    pub fn update_str(&mut self, value: &str) {
        self.update_u32(value.len() as u32);
        self.hasher.update(value.as_bytes());
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute a snapshot digest.
///
/// The closure adds the per-combatant data after the tick.
pub fn compute_snapshot_hash<F>(tick: u32, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_snapshot();
    hasher.update_u32(tick);
    add_state(&mut hasher);
    hasher.finalize()
}

/// Short hex prefix for log lines.
pub fn short_hex(hash: &StateHash) -> String {
    hex::encode(&hash[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_hasher_determinism() {
        let make_hash = || {
            let mut hasher = StateHasher::for_snapshot();
            hasher.update_u32(100);
            hasher.update_f32(5.5);
            hasher.update_vec2(Vec2::new(1.0, 2.0));
            hasher.update_bool(true);
            hasher.update_str("men_uchi");
            hasher.finalize()
        };

        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn test_hash_order_matters() {
        let hash1 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(1);
            h.update_u32(2);
            h.finalize()
        };

        let hash2 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(2);
            h.update_u32(1);
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_negative_zero_is_distinct() {
        // Bitwise comparison: -0.0 and 0.0 are different synchronized values.
        let a = compute_snapshot_hash(1, |h| h.update_f32(0.0));
        let b = compute_snapshot_hash(1, |h| h.update_f32(-0.0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_compute_snapshot_hash_tick_matters() {
        let a = compute_snapshot_hash(100, |h| h.update_bool(true));
        let b = compute_snapshot_hash(101, |h| h.update_bool(true));
        assert_ne!(a, b);
        assert_eq!(short_hex(&a).len(), 12);
    }
}
