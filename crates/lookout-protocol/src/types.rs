//! Signaling types for Lookout's wire format.
//!
//! Every message is a flat JSON object tagged by `command`. Inbound
//! messages name their `sender`, outbound ones their `recipient`:
//!
//! ```text
//! ← {"command":"camera_ping","sender":"cam1"}
//! ← {"command":"sdp_offer","sender":"cam1","sdp_type":"offer","sdp":"v=0..."}
//! ← {"command":"ice_candidate","sender":"cam1","index":0,"candidate":"candidate:..."}
//! → {"command":"discovery"}
//! → {"command":"call_init","recipient":"cam1"}
//! → {"command":"sdp_answer","recipient":"cam1","sdp_type":"answer","sdp":"v=0..."}
//! → {"command":"ice_candidate","recipient":"cam1","index":0,"candidate":"candidate:..."}
//! ```

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Opaque identifier of a remote peer (a camera).
///
/// Serialized as a plain JSON string. The value is never inspected, only
/// compared and echoed back.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Wraps an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Session descriptions and candidates
// ---------------------------------------------------------------------------

/// The role of a session description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Offer => "offer",
            Self::Pranswer => "pranswer",
            Self::Answer => "answer",
            Self::Rollback => "rollback",
        })
    }
}

/// A session description: its role plus the SDP body, carried verbatim.
///
/// Flattened into messages as `sdp_type` and `sdp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// One connectivity candidate.
///
/// `index` is the media-line (fragment) index the candidate belongs to.
/// It is a `u16` on the wire; anything larger fails to decode rather than
/// being truncated. `candidate` is passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub index: u16,
    pub candidate: String,
}

impl IceCandidate {
    pub fn new(index: u16, candidate: impl Into<String>) -> Self {
        Self {
            index,
            candidate: candidate.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A message pushed by the server over the event stream.
///
/// Only these tags are understood. Anything else decodes to
/// [`Decoded::Unknown`](crate::Decoded::Unknown) instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum InboundMessage {
    /// A camera announcing itself, usually in reply to our discovery.
    CameraPing { sender: PeerId },

    /// The camera's offer.
    SdpOffer {
        sender: PeerId,
        #[serde(flatten)]
        description: SessionDescription,
    },

    /// One of the camera's candidates.
    IceCandidate {
        sender: PeerId,
        #[serde(flatten)]
        candidate: IceCandidate,
    },
}

impl InboundMessage {
    /// Every `command` tag this enum decodes.
    pub const COMMANDS: &'static [&'static str] =
        &["camera_ping", "sdp_offer", "ice_candidate"];

    /// The peer that sent this message.
    pub fn sender(&self) -> &PeerId {
        match self {
            Self::CameraPing { sender }
            | Self::SdpOffer { sender, .. }
            | Self::IceCandidate { sender, .. } => sender,
        }
    }

    /// The wire tag of this message.
    pub fn command(&self) -> &'static str {
        match self {
            Self::CameraPing { .. } => "camera_ping",
            Self::SdpOffer { .. } => "sdp_offer",
            Self::IceCandidate { .. } => "ice_candidate",
        }
    }
}

/// A message this client posts to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Broadcast: "cameras, announce yourselves".
    Discovery,

    /// Ask one camera to start a call by sending us an offer.
    CallInit { recipient: PeerId },

    /// Our answer to a camera's offer.
    SdpAnswer {
        recipient: PeerId,
        #[serde(flatten)]
        description: SessionDescription,
    },

    /// One of our local candidates.
    IceCandidate {
        recipient: PeerId,
        #[serde(flatten)]
        candidate: IceCandidate,
    },
}

impl OutboundMessage {
    /// The addressed peer, or `None` for a broadcast.
    pub fn recipient(&self) -> Option<&PeerId> {
        match self {
            Self::Discovery => None,
            Self::CallInit { recipient }
            | Self::SdpAnswer { recipient, .. }
            | Self::IceCandidate { recipient, .. } => Some(recipient),
        }
    }

    /// The wire tag of this message.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::CallInit { .. } => "call_init",
            Self::SdpAnswer { .. } => "sdp_answer",
            Self::IceCandidate { .. } => "ice_candidate",
        }
    }
}
