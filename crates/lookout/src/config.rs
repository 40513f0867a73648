//! Client configuration and the builder that turns it into a client.

use lookout_peer::{PeerConnector, PeerRegistry, StreamOf, Viewer};
use lookout_protocol::PeerId;
use lookout_transport::{
    BackoffConfig, HttpRelay, Relay, SseSubscriber, Subscriber, TransportError,
};
use tokio::sync::mpsc;

use crate::{ClientHandle, LookoutError, SignalingClient};

/// Where the relay lives and how to reconnect to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// The server's event stream.
    pub events_url: String,
    /// The endpoint outbound messages are posted to.
    pub relay_url: String,
    /// Reconnect delays for the event stream.
    pub backoff: BackoffConfig,
    /// Our own identity on the relay, if it has one. Inbound messages
    /// from this sender are echoes and get ignored.
    pub self_id: Option<PeerId>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            events_url: "http://127.0.0.1:8000/events".to_string(),
            relay_url: "http://127.0.0.1:8000/message".to_string(),
            backoff: BackoffConfig::default(),
            self_id: None,
        }
    }
}

impl ClientConfig {
    /// Starts a builder from the defaults.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Checks the URLs are present and the backoff bounds are sane.
    ///
    /// # Errors
    /// [`TransportError::InvalidConfig`] naming the bad setting.
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.events_url.trim().is_empty() {
            return Err(TransportError::InvalidConfig(
                "events_url is empty".into(),
            ));
        }
        if self.relay_url.trim().is_empty() {
            return Err(TransportError::InvalidConfig(
                "relay_url is empty".into(),
            ));
        }
        self.backoff.validate()?;
        Ok(())
    }
}

/// Builder for configuring a [`SignalingClient`].
///
/// # Example
///
/// ```rust,ignore
/// use lookout::prelude::*;
///
/// let (client, handle) = ClientConfig::builder()
///     .events_url("http://relay.local:8000/events")
///     .relay_url("http://relay.local:8000/message")
///     .build(my_connector, my_viewer)?;
/// tokio::spawn(client.run());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the event stream URL.
    pub fn events_url(mut self, url: impl Into<String>) -> Self {
        self.config.events_url = url.into();
        self
    }

    /// Sets the relay endpoint URL.
    pub fn relay_url(mut self, url: impl Into<String>) -> Self {
        self.config.relay_url = url.into();
        self
    }

    /// Sets the reconnect delays.
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// Sets our own identity so relay echoes are ignored.
    pub fn self_id(mut self, id: impl Into<PeerId>) -> Self {
        self.config.self_id = Some(id.into());
        self
    }

    /// Builds a client that talks HTTP: an event-stream subscriber on
    /// `events_url` and a relay posting to `relay_url`.
    ///
    /// Nothing connects until [`SignalingClient::run`] is called.
    ///
    /// # Errors
    /// - [`TransportError::InvalidConfig`] for a bad setting
    /// - [`TransportError::Http`] if an HTTP client can't be built
    pub fn build<P, V>(
        self,
        connector: P,
        viewer: V,
    ) -> Result<(SignalingClient<SseSubscriber, HttpRelay, P, V>, ClientHandle), LookoutError>
    where
        P: PeerConnector,
        V: Viewer<StreamOf<P>>,
    {
        self.config.validate()?;
        let subscriber = SseSubscriber::new()?;
        let relay = HttpRelay::new(self.config.relay_url.clone())?;
        self.build_with(subscriber, relay, connector, viewer)
    }

    /// Builds a client on caller-supplied transport halves.
    ///
    /// `relay_url` is not used here; `relay` already knows where to post.
    ///
    /// # Errors
    /// [`TransportError::InvalidConfig`] for a bad setting.
    pub fn build_with<S, R, P, V>(
        self,
        subscriber: S,
        relay: R,
        connector: P,
        viewer: V,
    ) -> Result<(SignalingClient<S, R, P, V>, ClientHandle), LookoutError>
    where
        S: Subscriber,
        R: Relay,
        P: PeerConnector,
        V: Viewer<StreamOf<P>>,
    {
        self.config.validate()?;
        let (registry, peer_events) = PeerRegistry::new(connector);
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let client = SignalingClient {
            config: self.config,
            subscriber,
            relay,
            registry,
            peer_events,
            viewer,
            control: control_rx,
        };
        Ok((client, ClientHandle::new(control_tx)))
    }
}
