//! Unified error type for the Lookout client.

use lookout_peer::PeerError;
use lookout_protocol::ProtocolError;
use lookout_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Runtime failures inside the client loop are logged, not returned, so
/// this mostly surfaces from building the client and from
/// [`ClientHandle`](crate::ClientHandle) calls.
#[derive(Debug, thiserror::Error)]
pub enum LookoutError {
    /// A transport-level error (subscribe, receive, relay).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A peer-level error (negotiation, unknown peer, bad state).
    #[error(transparent)]
    Peer(#[from] PeerError),

    /// The client loop is no longer running.
    #[error("signaling client has stopped")]
    Stopped,
}
