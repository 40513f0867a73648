//! Error types for the peer layer.

use lookout_protocol::{PeerId, SdpType};

use crate::{NegotiationState, NegotiationStep};

/// A failure reported by the media capability (the real-time transport).
///
/// The capability is an external collaborator, so its errors arrive as
/// text. `Closed` is for calls made after the connection was released.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    /// The capability rejected the call.
    #[error("{0}")]
    Failed(String),

    /// The connection was already closed.
    #[error("connection closed")]
    Closed,
}

/// Errors that can occur while driving a peer session.
///
/// None of these are fatal: the caller logs them and the session stays in
/// whatever state it was in before the failing call.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// No session exists for this peer (discovery must come first).
    #[error("no session for peer {0}")]
    NotFound(PeerId),

    /// The capability could not create a connection for a new session.
    #[error("failed to open connection to {peer}: {source}")]
    Connect {
        peer: PeerId,
        #[source]
        source: MediaError,
    },

    /// One step of the offer → answer sequence failed.
    #[error("{step} failed for {peer}: {source}")]
    Negotiation {
        peer: PeerId,
        step: NegotiationStep,
        #[source]
        source: MediaError,
    },

    /// A negotiation sequence is already running for this peer.
    #[error("negotiation already in progress for {0}")]
    NegotiationInProgress(PeerId),

    /// The session's state doesn't allow this operation. States only move
    /// forward; a fresh negotiation needs a fresh session.
    #[error("peer {peer} cannot {action} while {state}")]
    InvalidState {
        peer: PeerId,
        state: NegotiationState,
        action: &'static str,
    },

    /// An offer slot carried a description of another type.
    #[error("expected an offer from {peer}, got {sdp_type}")]
    UnexpectedDescription { peer: PeerId, sdp_type: SdpType },
}
