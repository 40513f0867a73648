/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The event stream was closed by the server.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Opening the event stream failed before any event arrived.
    #[error("subscribe failed: {0}")]
    SubscribeFailed(String),

    /// Reading from an open event stream failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// The relay endpoint answered with a non-success status.
    #[error("relay rejected message with status {0}")]
    Rejected(u16),

    /// The underlying HTTP client failed.
    #[cfg(feature = "http")]
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A transport setting is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
