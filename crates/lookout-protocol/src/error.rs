//! Error types for the protocol layer.
//!
//! Every failure here means one payload could not be turned into a message
//! (or back). None of them say anything about the connection the payload
//! travelled on.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing or non-string
    /// `command` tag, or a field with the wrong type.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The payload parsed, but breaks a protocol rule. For example a
    /// recognized `command` whose body is missing required fields.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
