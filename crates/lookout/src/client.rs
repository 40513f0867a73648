//! `SignalingClient` and its control handle.
//!
//! This is the composition root: it ties the layers together
//! (transport → protocol → peer) and runs them on one Tokio task.

use lookout_peer::{
    NegotiationState, PeerConnector, PeerError, PeerEventReceiver, PeerRegistry,
    StreamOf, Viewer,
};
use lookout_protocol::PeerId;
use lookout_transport::{Backoff, Relay, Subscriber, TransportError};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::{ClientConfig, LookoutError, SignalingTransport};

/// A snapshot of one session, for [`ClientStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerStatus {
    pub peer: PeerId,
    pub state: NegotiationState,
}

/// A snapshot of the whole client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientStatus {
    /// Whether the event stream is currently open.
    pub connected: bool,
    /// Every live session, sorted by peer.
    pub peers: Vec<PeerStatus>,
}

pub(crate) enum Command {
    Teardown {
        peer: PeerId,
        reply: oneshot::Sender<Result<(), PeerError>>,
    },
    Status(oneshot::Sender<ClientStatus>),
    Shutdown,
}

/// Talks to a running [`SignalingClient`]. Cheap to clone.
///
/// Dropping every handle does not stop the client; call
/// [`ClientHandle::shutdown`] or drop the `run` future for that.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl ClientHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { tx }
    }

    /// Tears down `peer`'s session: the connection is closed, the sink is
    /// handed back to the viewer, and the peer is forgotten until its next
    /// ping.
    ///
    /// # Errors
    /// - [`LookoutError::Peer`] if the peer has no session
    /// - [`LookoutError::Stopped`] if the client isn't running
    pub async fn teardown(&self, peer: impl Into<PeerId>) -> Result<(), LookoutError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Teardown {
                peer: peer.into(),
                reply,
            })
            .map_err(|_| LookoutError::Stopped)?;
        rx.await.map_err(|_| LookoutError::Stopped)??;
        Ok(())
    }

    /// Returns the client's current connectivity and sessions.
    ///
    /// # Errors
    /// [`LookoutError::Stopped`] if the client isn't running.
    pub async fn status(&self) -> Result<ClientStatus, LookoutError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Status(reply))
            .map_err(|_| LookoutError::Stopped)?;
        rx.await.map_err(|_| LookoutError::Stopped)
    }

    /// Asks the client to close every session, stop the event channel and
    /// return from `run`. Does nothing if it already stopped.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }

    /// Returns `true` once the client loop has exited.
    pub fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The signaling client.
///
/// Built with [`ClientConfig::builder`]; nothing happens until
/// [`run`](Self::run) is awaited.
pub struct SignalingClient<S, R, P, V>
where
    S: Subscriber,
    R: Relay,
    P: PeerConnector,
    V: Viewer<StreamOf<P>>,
{
    pub(crate) config: ClientConfig,
    pub(crate) subscriber: S,
    pub(crate) relay: R,
    pub(crate) registry: PeerRegistry<P, V::Sink>,
    pub(crate) peer_events: PeerEventReceiver<StreamOf<P>>,
    pub(crate) viewer: V,
    pub(crate) control: mpsc::UnboundedReceiver<Command>,
}

impl<S, R, P, V> SignalingClient<S, R, P, V>
where
    S: Subscriber,
    R: Relay,
    P: PeerConnector,
    V: Viewer<StreamOf<P>>,
{
    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Runs the client until it is shut down.
    ///
    /// Opens the event stream (reconnecting forever with backoff), sends
    /// discovery on every connect, and drives one session per discovered
    /// peer. Every failure along the way is logged and the loop keeps
    /// going.
    ///
    /// # Errors
    /// [`LookoutError::Transport`] if the event channel stops on its own,
    /// which only happens if its task dies.
    pub async fn run(self) -> Result<(), LookoutError> {
        let Self {
            config,
            subscriber,
            relay,
            registry,
            mut peer_events,
            viewer,
            mut control,
        } = self;

        info!(
            events_url = %config.events_url,
            relay_url = %config.relay_url,
            "signaling client running"
        );
        let transport = SignalingTransport::connect(
            subscriber,
            relay,
            config.events_url.clone(),
            Backoff::new(config.backoff),
        );
        let mut dispatcher = Dispatcher::new(transport, registry, viewer, config.self_id);
        let mut control_open = true;

        let outcome = loop {
            tokio::select! {
                event = dispatcher.transport.recv() => match event {
                    Some(event) => dispatcher.on_transport_event(event).await,
                    None => {
                        warn!("event channel stopped unexpectedly");
                        break Err(TransportError::ConnectionClosed(
                            "event channel stopped".into(),
                        )
                        .into());
                    }
                },
                Some(event) = peer_events.recv() => {
                    dispatcher.on_peer_event(event).await;
                }
                command = control.recv(), if control_open => match command {
                    Some(Command::Teardown { peer, reply }) => {
                        let result = dispatcher.teardown(&peer).await;
                        if let Err(e) = &result {
                            debug!(%peer, error = %e, "teardown failed");
                        }
                        let _ = reply.send(result);
                    }
                    Some(Command::Status(reply)) => {
                        let _ = reply.send(dispatcher.status());
                    }
                    Some(Command::Shutdown) => {
                        info!("shutdown requested");
                        break Ok(());
                    }
                    None => {
                        debug!("all client handles dropped");
                        control_open = false;
                    }
                },
            }
        };

        dispatcher.close().await;
        info!("signaling client stopped");
        outcome
    }
}
