//! Wire protocol for Lookout.
//!
//! - **Types** ([`PeerId`], [`SessionDescription`], [`IceCandidate`],
//!   [`InboundMessage`], [`OutboundMessage`]): what travels on the wire.
//! - **Codec** ([`Codec`], [`JsonCodec`], [`MessageCodec`]): how those
//!   messages become bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (raw text) → Protocol (Decoded) → Peer (negotiation)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, Decoded, MessageCodec};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    IceCandidate, InboundMessage, OutboundMessage, PeerId, SdpType,
    SessionDescription,
};
