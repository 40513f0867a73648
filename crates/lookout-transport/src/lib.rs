//! Transport layer for Lookout.
//!
//! Two directions, two seams:
//!
//! - **Inbound**: a [`Subscriber`] opens a one-way event stream and a
//!   [`Subscription`] yields its raw text events. The [`EventChannel`]
//!   keeps one subscription alive, reconnecting with [`Backoff`].
//! - **Outbound**: a [`Relay`] posts one encoded payload per request.
//!
//! The layer moves text and bytes only. Decoding belongs to
//! `lookout-protocol`.
//!
//! # Feature Flags
//!
//! - `http` (default): [`SseSubscriber`] and [`HttpRelay`] via `reqwest`

mod backoff;
mod channel;
mod error;
#[cfg(feature = "http")]
mod relay;
mod sse;

pub use backoff::{Backoff, BackoffConfig};
pub use channel::{ChannelEvent, EventChannel, EventChannelHandle};
pub use error::TransportError;
#[cfg(feature = "http")]
pub use relay::HttpRelay;
pub use sse::SseParser;
#[cfg(feature = "http")]
pub use sse::{SseSubscriber, SseSubscription};

use std::future::Future;

/// Opens subscriptions to a server-pushed event stream.
pub trait Subscriber: Send + Sync + 'static {
    /// The open stream produced by this subscriber.
    type Subscription: Subscription;

    /// Opens a new subscription to `uri`.
    ///
    /// Resolves once the server has accepted the stream; failures before
    /// that point are returned here rather than from the subscription.
    fn subscribe(
        &self,
        uri: &str,
    ) -> impl Future<Output = Result<Self::Subscription, TransportError>> + Send;
}

/// A single open event stream.
///
/// Dropping the subscription closes it.
pub trait Subscription: Send + 'static {
    /// Waits for the next raw event payload.
    ///
    /// Returns `Ok(None)` when the server ends the stream cleanly.
    fn next_event(
        &mut self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;
}

/// Sends encoded outbound payloads to the relay endpoint.
///
/// One call is one request. A returned error means the message was lost;
/// nothing here retries.
pub trait Relay: Send + Sync + 'static {
    /// Posts `body` to the relay.
    fn post(
        &self,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
