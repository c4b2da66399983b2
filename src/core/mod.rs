//! Core primitives.
//!
//! Math and determinism helpers shared by the simulation and the network
//! layer. Nothing in here knows about combat.

pub mod vec2;
pub mod rng;
pub mod hash;

// Re-export core types
pub use vec2::{Vec2, angle_diff};
pub use rng::DeterministicRng;
pub use hash::{StateHash, StateHasher, compute_snapshot_hash};
