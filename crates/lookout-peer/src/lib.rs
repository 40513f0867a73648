//! Peer sessions for Lookout.
//!
//! This crate owns everything that happens per camera once it has been
//! discovered:
//!
//! 1. **Capabilities**: what the session needs from the outside world:
//!    a media connection ([`PeerConnector`], [`PeerConnection`]) and a
//!    place to show streams ([`Viewer`])
//! 2. **Negotiation**: the forward-only offer/answer state machine and
//!    candidate exchange ([`PeerSession`])
//! 3. **Registry**: one session per peer, created idempotently on
//!    discovery ([`PeerRegistry`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Client (above)  ← routes decoded messages and peer events, sends outboxes
//!     ↕
//! Peer Layer (this crate)  ← per-peer negotiation state
//!     ↕
//! Protocol Layer (below)  ← provides PeerId, SessionDescription, IceCandidate
//! ```

mod connection;
mod error;
mod registry;
mod session;

pub use connection::{
    ConnectionEvents, PeerConnection, PeerConnector, PeerEvent, PeerEventKind,
    PeerEventReceiver, PeerEventSender, StreamOf, Viewer,
};
pub use error::{MediaError, PeerError};
pub use registry::{Ensured, PeerRegistry, SessionOf};
pub use session::{
    CandidateDisposition, NegotiationState, NegotiationStep, PeerSession,
};
