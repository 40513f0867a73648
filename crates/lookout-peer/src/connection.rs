//! The media capability and the viewer: the two external collaborators a
//! peer session drives.
//!
//! Lookout doesn't implement the real-time transport itself. It needs
//! something that can set descriptions, create an answer and add
//! candidates, and that reports local candidates and incoming streams
//! back. That's [`PeerConnector`] + [`PeerConnection`]. Where the media
//! ends up on screen is the [`Viewer`]'s business.
//!
//! Callbacks from the capability never touch session state directly.
//! They go through [`ConnectionEvents`] into the client's event loop, which
//! owns every session.

use std::future::Future;

use lookout_protocol::{IceCandidate, PeerId, SessionDescription};
use tokio::sync::mpsc;

use crate::{MediaError, PeerError};

/// Creates one media connection per peer.
pub trait PeerConnector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: PeerConnection;

    /// Opens a connection for `peer`.
    ///
    /// `events` is how the connection reports local candidates, the end of
    /// candidate gathering, and incoming streams. Keep it for as long as
    /// the connection lives.
    fn connect(
        &self,
        peer: &PeerId,
        events: ConnectionEvents<StreamOf<Self>>,
    ) -> impl Future<Output = Result<Self::Connection, MediaError>> + Send;
}

/// One peer's media connection, consumed as a capability.
///
/// Every call is async and may fail. The session never calls two of these
/// concurrently for the same negotiation step, but candidate adds may run
/// while a negotiation is in flight, hence `Sync`.
pub trait PeerConnection: Send + Sync + 'static {
    /// The incoming media stream handed to the viewer.
    type Stream: Send + 'static;

    /// Applies the remote peer's description.
    fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> impl Future<Output = Result<(), MediaError>> + Send;

    /// Produces a local answer for the applied remote offer.
    fn create_answer(
        &self,
    ) -> impl Future<Output = Result<SessionDescription, MediaError>> + Send;

    /// Applies our own description.
    fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> impl Future<Output = Result<(), MediaError>> + Send;

    /// Adds one remote candidate.
    fn add_ice_candidate(
        &self,
        candidate: IceCandidate,
    ) -> impl Future<Output = Result<(), MediaError>> + Send;

    /// Releases the connection.
    fn close(&self) -> impl Future<Output = Result<(), MediaError>> + Send;
}

/// The stream type of a connector's connections.
pub type StreamOf<P> =
    <<P as PeerConnector>::Connection as PeerConnection>::Stream;

/// Where streams are shown, and where connectivity is reported.
///
/// Methods are synchronous: they run on the client's event loop and must
/// not block.
pub trait Viewer<S>: Send + 'static {
    /// Opaque handle to one peer's rendering target.
    type Sink: Send + 'static;

    /// Creates the rendering target for a newly discovered peer.
    fn create_sink(&mut self, peer: &PeerId) -> Self::Sink;

    /// Shows an incoming stream in a peer's sink.
    fn show(&mut self, sink: &mut Self::Sink, stream: S);

    /// Gives back a sink whose session was torn down.
    fn release_sink(&mut self, sink: Self::Sink) {
        drop(sink);
    }

    /// The signaling channel connected (`true`) or dropped (`false`).
    fn connectivity_changed(&mut self, connected: bool) {
        let _ = connected;
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Something that happened to one session, outside the event loop.
#[derive(Debug)]
pub struct PeerEvent<S> {
    /// The peer the event belongs to.
    pub peer: PeerId,
    /// Which incarnation of that peer's session produced it.
    pub epoch: u64,
    pub kind: PeerEventKind<S>,
}

/// The payload of a [`PeerEvent`].
#[derive(Debug)]
pub enum PeerEventKind<S> {
    /// The connection gathered a local candidate.
    LocalCandidate(IceCandidate),
    /// Candidate gathering finished; no more local candidates follow.
    GatheringComplete,
    /// A remote media stream arrived.
    Track(S),
    /// The negotiation task applied the remote offer.
    RemoteDescriptionApplied,
    /// The negotiation task finished, with the local answer on success.
    Negotiated(Result<SessionDescription, PeerError>),
}

/// Sender half of the peer event channel.
pub type PeerEventSender<S> = mpsc::UnboundedSender<PeerEvent<S>>;

/// Receiver half of the peer event channel.
pub type PeerEventReceiver<S> = mpsc::UnboundedReceiver<PeerEvent<S>>;

/// Reports events for one session into the client's event loop.
///
/// Sends never block. If the event loop is gone the event is dropped.
pub struct ConnectionEvents<S> {
    peer: PeerId,
    epoch: u64,
    tx: PeerEventSender<S>,
}

impl<S> Clone for ConnectionEvents<S> {
    fn clone(&self) -> Self {
        Self {
            peer: self.peer.clone(),
            epoch: self.epoch,
            tx: self.tx.clone(),
        }
    }
}

impl<S> ConnectionEvents<S> {
    pub(crate) fn new(peer: PeerId, epoch: u64, tx: PeerEventSender<S>) -> Self {
        Self { peer, epoch, tx }
    }

    /// The peer these events are for.
    pub fn peer(&self) -> &PeerId {
        &self.peer
    }

    /// Reports a locally gathered candidate.
    pub fn local_candidate(&self, candidate: IceCandidate) {
        self.send(PeerEventKind::LocalCandidate(candidate));
    }

    /// Reports that candidate gathering finished.
    pub fn gathering_complete(&self) {
        self.send(PeerEventKind::GatheringComplete);
    }

    /// Reports an incoming media stream.
    pub fn track(&self, stream: S) {
        self.send(PeerEventKind::Track(stream));
    }

    pub(crate) fn send(&self, kind: PeerEventKind<S>) {
        let event = PeerEvent {
            peer: self.peer.clone(),
            epoch: self.epoch,
            kind,
        };
        if self.tx.send(event).is_err() {
            tracing::trace!(peer = %self.peer, "event loop gone, dropping peer event");
        }
    }
}
