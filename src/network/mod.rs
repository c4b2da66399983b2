//! Network Layer
//!
//! Authority / replica synchronization between two peers.
//! This layer is **non-deterministic** (arrival order, link failures); all
//! combat logic runs through `game/`.

pub mod protocol;
pub mod inbox;
pub mod transport;
pub mod session;

pub use protocol::{
    ApplyReport, CombatantSnapshot, Encoding, InputMessage, PeerMessage, ProtocolError, Snapshot,
    SnapshotEntry, WireFrame,
};
pub use inbox::{Inbox, InboxStats};
pub use transport::{LinkStatus, LoopbackTransport, Transport, TransportError, WsTransport};
pub use session::{PeerSession, Role, SessionConfig, SessionError, StepReport};
