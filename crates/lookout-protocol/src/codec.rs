//! Codecs: bytes ⇄ signaling messages.
//!
//! [`Codec`] is the serialization strategy (JSON today). [`MessageCodec`]
//! sits on top of it and is the one place the signaling vocabulary is
//! mapped to and from the wire. Its decode side never fails on an unknown
//! `command`; it returns [`Decoded::Unknown`] so the dispatcher can log and
//! drop the payload.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{InboundMessage, OutboundMessage, ProtocolError};

/// A codec that can encode Rust types to bytes and decode bytes back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`). The relay and the event
/// stream both speak JSON, so this is the only codec in use.
///
/// ```rust
/// use lookout_protocol::{Codec, JsonCodec, OutboundMessage, PeerId};
///
/// let codec = JsonCodec;
/// let msg = OutboundMessage::CallInit { recipient: PeerId::new("cam1") };
///
/// let bytes = codec.encode(&msg).unwrap();
/// assert_eq!(bytes, br#"{"command":"call_init","recipient":"cam1"}"#);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// MessageCodec
// ---------------------------------------------------------------------------

/// Result of decoding one inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A command from the closed vocabulary.
    Known(InboundMessage),
    /// A well-formed payload whose `command` this client doesn't handle
    /// (e.g. the server's welcome message).
    Unknown { command: String },
}

/// What a payload can look like before we know whether its tag is ours.
///
/// `untagged` tries the variants in order: a full inbound message first,
/// then anything that at least carries a string `command`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Wire {
    Known(InboundMessage),
    Tagged { command: String },
}

/// Encodes outbound and decodes inbound signaling messages.
///
/// ## Why a second layer
///
/// A plain [`Codec`] would happily decode straight into
/// [`InboundMessage`], but then "valid JSON with a command we don't know"
/// and "garbage" would be the same error. The relay broadcasts to every
/// client, so other commands show up all the time and must be ignored
/// quietly, while a broken `sdp_offer` is worth a warning. So a payload
/// is first tried as a full [`InboundMessage`]; if that fails, only its
/// `command` tag is read:
///
/// 1. No tag, or not JSON at all → [`ProtocolError::Decode`].
/// 2. A tag from our vocabulary → the body was bad (a missing field, or a
///    candidate index that doesn't fit in `u16`) →
///    [`ProtocolError::InvalidMessage`].
/// 3. Any other tag → [`Decoded::Unknown`].
///
/// Values are never adjusted on the way through: SDP text and candidate
/// strings come out exactly as they went in.
///
/// ## Generic over the codec
///
/// `C` is the serialization strategy. The client uses
/// [`MessageCodec::json`]; any other [`Codec`] slots in the same way.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageCodec<C: Codec> {
    codec: C,
}

#[cfg(feature = "json")]
impl MessageCodec<JsonCodec> {
    /// A message codec over JSON.
    pub fn json() -> Self {
        Self::new(JsonCodec)
    }
}

impl<C: Codec> MessageCodec<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }

    /// Encodes one outbound command. Same input, same bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the underlying codec fails.
    pub fn encode(&self, msg: &OutboundMessage) -> Result<Vec<u8>, ProtocolError> {
        self.codec.encode(msg)
    }

    /// Decodes one inbound payload.
    ///
    /// # Errors
    /// - `ProtocolError::Decode`: not valid JSON, or no string `command`
    /// - `ProtocolError::InvalidMessage`: a known `command` with a body
    ///   that doesn't match it (missing `sender`, index out of range, ...)
    pub fn decode(&self, data: &[u8]) -> Result<Decoded, ProtocolError> {
        match self.codec.decode::<Wire>(data)? {
            Wire::Known(msg) => Ok(Decoded::Known(msg)),
            Wire::Tagged { command }
                if InboundMessage::COMMANDS.contains(&command.as_str()) =>
            {
                Err(ProtocolError::InvalidMessage(format!(
                    "malformed {command} message"
                )))
            }
            Wire::Tagged { command } => Ok(Decoded::Unknown { command }),
        }
    }
}
