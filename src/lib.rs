//! # Ronin Duel
//!
//! Melee combat simulation with an authority / replica network model.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        RONIN DUEL                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  config.rs        - SimConfig (tuned constants, JSON load)   │
//! │                                                              │
//! │  core/            - Math + determinism primitives            │
//! │  ├── vec2.rs      - f32 2D vector                            │
//! │  ├── rng.rs       - Seeded Xorshift128+ PRNG                 │
//! │  └── hash.rs      - Snapshot digests (desync detection)      │
//! │                                                              │
//! │  game/            - Combat simulation (single owner, no I/O) │
//! │  ├── moves.rs     - Move catalog                             │
//! │  ├── combatant.rs - Combatant + behavior states              │
//! │  ├── state_machine.rs - Timers, kinematics, transitions      │
//! │  ├── hit.rs       - Parry / block / hit resolution           │
//! │  ├── ai.rs        - Bot policy                               │
//! │  ├── state.rs     - Match state                              │
//! │  └── tick.rs      - Authoritative simulation step            │
//! │                                                              │
//! │  network/         - Peer sync (non-deterministic)            │
//! │  ├── protocol.rs  - Input / Snapshot messages                │
//! │  ├── inbox.rs     - Latest-value receive slots               │
//! │  ├── transport.rs - Loopback + WebSocket links               │
//! │  └── session.rs   - Authority / replica roles                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority Model
//!
//! Only the authority resolves combat. Every tick it broadcasts a full
//! snapshot that the replica applies wholesale; the replica only integrates
//! motion in between and forwards its own input. The last received message
//! wins. There are no sequence numbers, so a reordered snapshot can briefly
//! rewind the replica.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::config::SimConfig;
pub use crate::core::rng::DeterministicRng;
pub use crate::core::vec2::Vec2;
pub use crate::game::input::{InputFrame, InputLatch};
pub use crate::game::state::{MatchSetup, MatchState, Seat};
pub use crate::game::tick::{tick, TickResult};
pub use crate::network::session::{PeerSession, Role, SessionConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Longest frame the simulation will integrate in one tick (seconds)
pub const MAX_FRAME_DT: f32 = 0.1;
