//! Routing: transport events and peer events in, session calls and
//! outbound messages out.
//!
//! Everything here runs on the client's single task, one event at a time.
//! Outbound messages are sent inline, so they reach the relay in the
//! order the sessions produced them.

use lookout_peer::{
    Ensured, PeerConnector, PeerError, PeerEvent, PeerRegistry, StreamOf, Viewer,
};
use lookout_protocol::{Decoded, InboundMessage, OutboundMessage, PeerId};
use lookout_transport::Relay;
use tracing::{debug, info, trace, warn};

use crate::{ClientStatus, PeerStatus, SignalingTransport, TransportEvent};

pub(crate) struct Dispatcher<R, P, V>
where
    R: Relay,
    P: PeerConnector,
    V: Viewer<StreamOf<P>>,
{
    pub(crate) transport: SignalingTransport<R>,
    registry: PeerRegistry<P, V::Sink>,
    viewer: V,
    self_id: Option<PeerId>,
    /// Last connectivity reported to the viewer (`None` before the first).
    reported: Option<bool>,
}

impl<R, P, V> Dispatcher<R, P, V>
where
    R: Relay,
    P: PeerConnector,
    V: Viewer<StreamOf<P>>,
{
    pub(crate) fn new(
        transport: SignalingTransport<R>,
        registry: PeerRegistry<P, V::Sink>,
        viewer: V,
        self_id: Option<PeerId>,
    ) -> Self {
        Self {
            transport,
            registry,
            viewer,
            self_id,
            reported: None,
        }
    }

    fn is_connected(&self) -> bool {
        self.reported == Some(true)
    }

    fn report_connectivity(&mut self, connected: bool) {
        if self.reported != Some(connected) {
            self.reported = Some(connected);
            self.viewer.connectivity_changed(connected);
        }
    }

    pub(crate) async fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                info!("signaling connected, broadcasting discovery");
                self.report_connectivity(true);
                self.transport.send(&OutboundMessage::Discovery).await;
            }
            TransportEvent::Disconnected { retry_in } => {
                // Sessions survive; only the indicator changes.
                info!(
                    delay_secs = retry_in.as_secs(),
                    peers = self.registry.len(),
                    "signaling disconnected"
                );
                self.report_connectivity(false);
            }
            TransportEvent::Message(Decoded::Known(msg)) => self.on_message(msg).await,
            TransportEvent::Message(Decoded::Unknown { command }) => {
                debug!(%command, "ignoring unhandled command");
            }
        }
    }

    async fn on_message(&mut self, msg: InboundMessage) {
        if self.self_id.as_ref() == Some(msg.sender()) {
            trace!(command = msg.command(), "ignoring our own echo");
            return;
        }

        match msg {
            InboundMessage::CameraPing { sender } => {
                match self.registry.ensure(&sender, &mut self.viewer).await {
                    Ok(Ensured::Created) => self.flush(&sender).await,
                    Ok(Ensured::Existing) => {
                        trace!(peer = %sender, "ping from known peer");
                    }
                    Err(e) => warn!(peer = %sender, error = %e, "failed to create session"),
                }
            }
            InboundMessage::SdpOffer {
                sender,
                description,
            } => {
                let Some(session) = self.registry.get_mut(&sender) else {
                    debug!(peer = %sender, "offer from undiscovered peer, dropping");
                    return;
                };
                if let Err(e) = session.handle_offer(description) {
                    warn!(peer = %sender, error = %e, "offer rejected");
                }
            }
            InboundMessage::IceCandidate { sender, candidate } => {
                let Some(session) = self.registry.get_mut(&sender) else {
                    debug!(peer = %sender, "candidate from undiscovered peer, dropping");
                    return;
                };
                let disposition = session.add_remote_candidate(candidate).await;
                trace!(peer = %sender, ?disposition, "remote candidate");
            }
        }
    }

    pub(crate) async fn on_peer_event(&mut self, event: PeerEvent<StreamOf<P>>) {
        let peer = event.peer.clone();
        if let Err(e) = self.registry.handle_event(event, &mut self.viewer).await {
            warn!(%peer, error = %e, "negotiation failed");
        }
        self.flush(&peer).await;
    }

    /// Sends whatever `peer`'s session has queued.
    async fn flush(&mut self, peer: &PeerId) {
        for msg in self.registry.take_outbound(peer) {
            self.transport.send(&msg).await;
        }
    }

    pub(crate) async fn teardown(&mut self, peer: &PeerId) -> Result<(), PeerError> {
        self.registry.remove(peer, &mut self.viewer).await
    }

    pub(crate) fn status(&self) -> ClientStatus {
        let mut peers: Vec<PeerStatus> = self
            .registry
            .sessions()
            .map(|session| PeerStatus {
                peer: session.peer().clone(),
                state: session.state(),
            })
            .collect();
        peers.sort_by(|a, b| a.peer.cmp(&b.peer));
        ClientStatus {
            connected: self.is_connected(),
            peers,
        }
    }

    /// Closes every session and stops the event channel.
    pub(crate) async fn close(&mut self) {
        self.registry.close_all(&mut self.viewer).await;
        self.transport.shutdown().await;
        self.report_connectivity(false);
    }
}
