//! The peer registry: one session per discovered peer.
//!
//! Like the rest of this crate, `PeerRegistry` is not thread-safe by
//! itself. It is owned by the client's event loop and only touched from
//! there. Background work (negotiation tasks, connection callbacks) talks
//! to it through the peer event channel returned by
//! [`PeerRegistry::new`].

use std::collections::HashMap;

use lookout_protocol::{OutboundMessage, PeerId};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::{
    ConnectionEvents, PeerConnector, PeerError, PeerEvent, PeerEventKind,
    PeerEventReceiver, PeerEventSender, PeerSession, StreamOf, Viewer,
};

/// The session type a registry over connector `P` holds.
pub type SessionOf<P, K> = PeerSession<<P as PeerConnector>::Connection, K>;

/// Outcome of [`PeerRegistry::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    /// A new session was opened and `call_init` queued.
    Created,
    /// The peer already had a session; nothing changed.
    Existing,
}

/// Owns every live [`PeerSession`], keyed by peer.
///
/// `K` is the viewer's sink type.
pub struct PeerRegistry<P: PeerConnector, K> {
    connector: P,
    sessions: HashMap<PeerId, SessionOf<P, K>>,
    events: PeerEventSender<StreamOf<P>>,
    /// Incremented for every session created, so a re-created session
    /// never sees events addressed to its predecessor.
    next_epoch: u64,
}

impl<P: PeerConnector, K> PeerRegistry<P, K> {
    /// Creates an empty registry and the receiver its sessions report to.
    pub fn new(connector: P) -> (Self, PeerEventReceiver<StreamOf<P>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registry = Self {
            connector,
            sessions: HashMap::new(),
            events: tx,
            next_epoch: 0,
        };
        (registry, rx)
    }

    /// Makes sure `peer` has a session. Idempotent.
    ///
    /// For an unknown peer this opens a connection, creates its sink and
    /// starts negotiation (queues `call_init`). For a known one it does
    /// nothing at all, whatever state that session is in.
    ///
    /// # Errors
    /// [`PeerError::Connect`] if the connector fails. No session is
    /// recorded in that case, so a later ping can try again.
    pub async fn ensure<V>(
        &mut self,
        peer: &PeerId,
        viewer: &mut V,
    ) -> Result<Ensured, PeerError>
    where
        V: Viewer<StreamOf<P>, Sink = K>,
    {
        if self.sessions.contains_key(peer) {
            trace!(%peer, "session already exists");
            return Ok(Ensured::Existing);
        }

        let epoch = self.next_epoch;
        self.next_epoch += 1;

        let events = ConnectionEvents::new(peer.clone(), epoch, self.events.clone());
        let connection = self
            .connector
            .connect(peer, events.clone())
            .await
            .map_err(|source| PeerError::Connect {
                peer: peer.clone(),
                source,
            })?;

        let sink = viewer.create_sink(peer);
        let mut session = PeerSession::new(peer.clone(), epoch, connection, events, sink);
        session.start()?;
        self.sessions.insert(peer.clone(), session);

        info!(%peer, epoch, "session created");
        Ok(Ensured::Created)
    }

    pub fn get(&self, peer: &PeerId) -> Option<&SessionOf<P, K>> {
        self.sessions.get(peer)
    }

    pub fn get_mut(&mut self, peer: &PeerId) -> Option<&mut SessionOf<P, K>> {
        self.sessions.get_mut(peer)
    }

    /// Like [`Self::get_mut`], but only if the session is the incarnation
    /// `epoch` refers to.
    pub fn session_for(
        &mut self,
        peer: &PeerId,
        epoch: u64,
    ) -> Option<&mut SessionOf<P, K>> {
        self.sessions
            .get_mut(peer)
            .filter(|session| session.epoch() == epoch)
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.sessions.contains_key(peer)
    }

    /// The peers with a session, in no particular order.
    pub fn peers(&self) -> impl Iterator<Item = &PeerId> {
        self.sessions.keys()
    }

    /// Every live session, in no particular order.
    pub fn sessions(&self) -> impl Iterator<Item = &SessionOf<P, K>> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Applies one event from a session's background side.
    ///
    /// Events from a session that no longer exists, or from an older
    /// incarnation of it, are dropped.
    ///
    /// # Errors
    /// Only a failed negotiation is reported, so the caller can log it.
    /// The session itself stays usable.
    pub async fn handle_event<V>(
        &mut self,
        event: PeerEvent<StreamOf<P>>,
        viewer: &mut V,
    ) -> Result<(), PeerError>
    where
        V: Viewer<StreamOf<P>, Sink = K>,
    {
        let PeerEvent { peer, epoch, kind } = event;
        let Some(session) = self.session_for(&peer, epoch) else {
            debug!(%peer, epoch, "dropping event for a stale session");
            return Ok(());
        };

        match kind {
            PeerEventKind::LocalCandidate(candidate) => {
                session.on_local_candidate(candidate);
            }
            PeerEventKind::GatheringComplete => session.on_gathering_complete(),
            PeerEventKind::Track(stream) => session.on_track(stream, viewer),
            PeerEventKind::RemoteDescriptionApplied => {
                session.on_remote_description_applied().await;
            }
            PeerEventKind::Negotiated(result) => session.on_negotiated(result)?,
        }
        Ok(())
    }

    /// Takes `peer`'s pending outbound messages, oldest first.
    pub fn take_outbound(&mut self, peer: &PeerId) -> Vec<OutboundMessage> {
        self.sessions
            .get_mut(peer)
            .map(|session| session.drain_outbox().collect())
            .unwrap_or_default()
    }

    /// Closes and forgets `peer`'s session, handing its sink back to the
    /// viewer. A later ping creates a fresh session.
    ///
    /// # Errors
    /// [`PeerError::NotFound`] if the peer has no session.
    pub async fn remove<V>(&mut self, peer: &PeerId, viewer: &mut V) -> Result<(), PeerError>
    where
        V: Viewer<StreamOf<P>, Sink = K>,
    {
        let mut session = self
            .sessions
            .remove(peer)
            .ok_or_else(|| PeerError::NotFound(peer.clone()))?;
        if let Some(sink) = session.close().await {
            viewer.release_sink(sink);
        }
        info!(%peer, "session removed");
        Ok(())
    }

    /// Closes every session.
    pub async fn close_all<V>(&mut self, viewer: &mut V)
    where
        V: Viewer<StreamOf<P>, Sink = K>,
    {
        let count = self.sessions.len();
        for (peer, mut session) in self.sessions.drain() {
            if let Some(sink) = session.close().await {
                viewer.release_sink(sink);
            } else {
                warn!(%peer, "session was already closed");
            }
        }
        if count > 0 {
            info!(count, "all sessions closed");
        }
    }
}
