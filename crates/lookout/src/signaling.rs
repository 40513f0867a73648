//! The signaling transport: event channel in, relay out, codec between.

use std::time::Duration;

use lookout_protocol::{Codec, Decoded, JsonCodec, MessageCodec, OutboundMessage};
use lookout_transport::{
    Backoff, ChannelEvent, EventChannel, EventChannelHandle, Relay, Subscriber,
};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// What the transport hands to the client, already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The event stream (re)connected.
    Connected,
    /// The event stream dropped; a reconnect follows after `retry_in`.
    Disconnected { retry_in: Duration },
    /// One inbound payload that decoded.
    Message(Decoded),
}

/// Owns the event channel and the relay, and speaks the wire format over
/// both.
///
/// Payloads that fail to decode are logged and never surface; send
/// failures are logged and the message is lost.
pub struct SignalingTransport<R: Relay, C: Codec = JsonCodec> {
    relay: R,
    codec: MessageCodec<C>,
    channel: Option<EventChannelHandle>,
    inbound: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl<R: Relay> SignalingTransport<R> {
    /// Starts subscribing to `events_url` and speaks JSON.
    pub fn connect<S: Subscriber>(
        subscriber: S,
        relay: R,
        events_url: impl Into<String>,
        backoff: Backoff,
    ) -> Self {
        Self::with_codec(subscriber, relay, events_url, backoff, MessageCodec::json())
    }
}

impl<R: Relay, C: Codec> SignalingTransport<R, C> {
    /// Starts subscribing to `events_url` with a custom codec.
    pub fn with_codec<S: Subscriber>(
        subscriber: S,
        relay: R,
        events_url: impl Into<String>,
        backoff: Backoff,
        codec: MessageCodec<C>,
    ) -> Self {
        let (channel, inbound) = EventChannel::spawn(subscriber, events_url, backoff);
        Self {
            relay,
            codec,
            channel: Some(channel),
            inbound,
        }
    }

    /// Encodes and posts one message. Returns whether the relay took it.
    pub async fn send(&self, msg: &OutboundMessage) -> bool {
        let body = match self.codec.encode(msg) {
            Ok(body) => body,
            Err(e) => {
                warn!(command = msg.command(), error = %e, "failed to encode message");
                return false;
            }
        };
        match self.relay.post(body).await {
            Ok(()) => {
                trace!(command = msg.command(), recipient = ?msg.recipient(), "sent");
                true
            }
            Err(e) => {
                warn!(
                    command = msg.command(),
                    recipient = ?msg.recipient(),
                    error = %e,
                    "failed to send message"
                );
                false
            }
        }
    }

    /// Waits for the next inbound event.
    ///
    /// Returns `None` once the event channel has stopped. Cancel-safe:
    /// dropping the future loses nothing.
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        loop {
            let event = match self.inbound.recv().await? {
                ChannelEvent::Connected => TransportEvent::Connected,
                ChannelEvent::Disconnected { retry_in } => {
                    TransportEvent::Disconnected { retry_in }
                }
                ChannelEvent::Message(raw) => {
                    trace!(payload = %raw, "inbound payload");
                    match self.codec.decode(raw.as_bytes()) {
                        Ok(decoded) => TransportEvent::Message(decoded),
                        Err(e) => {
                            debug!(error = %e, "dropping undecodable payload");
                            continue;
                        }
                    }
                }
            };
            return Some(event);
        }
    }

    /// Stops the event channel. Sending still works afterwards.
    pub async fn shutdown(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.shutdown().await;
        }
    }
}
