//! One peer's negotiation session.
//!
//! ```text
//!   Idle ──start()──→ AwaitingAnswer ──offer ok──→ Negotiating ──stream──→ Connected
//!                        │      ▲
//!                        └──────┘ offer failed (state unchanged, retryable)
//!
//!   any state ──close()──→ Closed
//! ```
//!
//! States only move forward. Candidate exchange runs beside the state
//! machine: local candidates go out as soon as they're gathered, remote
//! ones are added to the connection once a remote description exists and
//! buffered until then.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use lookout_protocol::{
    IceCandidate, OutboundMessage, PeerId, SdpType, SessionDescription,
};
use tracing::{debug, info, warn};

use crate::{
    ConnectionEvents, PeerConnection, PeerError, PeerEventKind, Viewer,
};

// ---------------------------------------------------------------------------
// NegotiationState
// ---------------------------------------------------------------------------

/// Where a session is in its offer/answer exchange.
///
/// Declaration order is the only allowed direction of travel, so the
/// derived `Ord` doubles as the "is this forward?" check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NegotiationState {
    /// Created, nothing sent yet.
    Idle,
    /// `call_init` sent; waiting for the peer's offer.
    AwaitingAnswer,
    /// Our answer is out; waiting for media.
    Negotiating,
    /// Media is flowing.
    Connected,
    /// Torn down. Terminal.
    Closed,
}

impl NegotiationState {
    /// Returns `true` if moving to `target` goes forward.
    pub fn can_advance_to(self, target: Self) -> bool {
        target > self
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::AwaitingAnswer => "awaiting answer",
            Self::Negotiating => "negotiating",
            Self::Connected => "connected",
            Self::Closed => "closed",
        })
    }
}

/// The steps of the offer → answer sequence, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStep {
    SetRemoteDescription,
    CreateAnswer,
    SetLocalDescription,
}

impl fmt::Display for NegotiationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SetRemoteDescription => "set remote description",
            Self::CreateAnswer => "create answer",
            Self::SetLocalDescription => "set local description",
        })
    }
}

/// What happened to an inbound remote candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateDisposition {
    /// Handed to the connection.
    Added,
    /// Held until the remote description is applied.
    Buffered,
    /// The pre-offer buffer is full; the candidate was discarded.
    BufferFull,
    /// The connection rejected it (logged, otherwise ignored).
    Rejected,
    /// The session is closed.
    Dropped,
}

// ---------------------------------------------------------------------------
// PeerSession
// ---------------------------------------------------------------------------

/// One discovered peer: its connection, its sink, and its negotiation.
///
/// A session is created by [`PeerRegistry::ensure`](crate::PeerRegistry::ensure)
/// when a peer announces itself, and lives until it is torn down or the
/// client stops. It never outlives its registry and is never shared: all
/// mutation happens on the event loop that owns the registry, one event
/// at a time, so none of the fields below need locking.
///
/// # Sending
///
/// Sessions don't send anything themselves. Every handler that produces
/// a message (`call_init`, the answer, local candidates) pushes it onto
/// an outbox, and the owner drains it with [`PeerSession::drain_outbox`]
/// after the handler returns. That keeps the wire order equal to the
/// order the session decided on, and keeps this type free of any relay.
///
/// # Background work
///
/// The only slow part is the offer → answer sequence, which runs on a
/// spawned task holding a clone of the connection. The task reports back
/// through the session's [`ConnectionEvents`], tagged with the session's
/// epoch, so a result that arrives after a teardown is dropped by the
/// registry instead of landing on a newer session for the same peer.
///
/// # Remote candidates
///
/// A camera may start trickling candidates before its offer has been
/// applied. Those are held, up to [`Self::MAX_BUFFERED_CANDIDATES`], and
/// handed to the connection in arrival order once the remote description
/// is in place. Anything past the cap is logged and discarded.
pub struct PeerSession<C: PeerConnection, K> {
    peer: PeerId,
    epoch: u64,
    state: NegotiationState,
    connection: Arc<C>,
    events: ConnectionEvents<C::Stream>,
    sink: Option<K>,

    /// A negotiation task is running.
    negotiating: bool,
    /// The connection holds a remote description, so candidates may be
    /// added directly.
    remote_applied: bool,
    /// Remote candidates that arrived before any remote description.
    buffered: Vec<IceCandidate>,
    /// Local gathering is over; late candidates are dropped.
    gathering_complete: bool,
    /// A media stream arrived (possibly before our answer went out).
    has_stream: bool,

    outbox: VecDeque<OutboundMessage>,
}

impl<C: PeerConnection, K> PeerSession<C, K> {
    /// How many remote candidates are held while no remote description
    /// exists. A real camera gathers a handful; a peer that keeps sending
    /// candidates without ever offering is cut off here.
    pub const MAX_BUFFERED_CANDIDATES: usize = 128;

    pub(crate) fn new(
        peer: PeerId,
        epoch: u64,
        connection: C,
        events: ConnectionEvents<C::Stream>,
        sink: K,
    ) -> Self {
        Self {
            peer,
            epoch,
            state: NegotiationState::Idle,
            connection: Arc::new(connection),
            events,
            sink: Some(sink),
            negotiating: false,
            remote_applied: false,
            buffered: Vec::new(),
            gathering_complete: false,
            has_stream: false,
            outbox: VecDeque::new(),
        }
    }

    pub fn peer(&self) -> &PeerId {
        &self.peer
    }

    /// Incarnation number; events from an older incarnation are ignored.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn is_negotiating(&self) -> bool {
        self.negotiating
    }

    pub fn remote_description_applied(&self) -> bool {
        self.remote_applied
    }

    /// Remote candidates waiting for the remote description.
    pub fn buffered_candidates(&self) -> &[IceCandidate] {
        &self.buffered
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Takes every pending outbound message, oldest first.
    pub fn drain_outbox(&mut self) -> impl Iterator<Item = OutboundMessage> + '_ {
        self.outbox.drain(..)
    }

    fn advance(&mut self, target: NegotiationState) {
        debug_assert!(self.state.can_advance_to(target));
        debug!(peer = %self.peer, from = %self.state, to = %target, "session state");
        self.state = target;
    }

    fn ensure_open(&self, action: &'static str) -> Result<(), PeerError> {
        if self.state == NegotiationState::Closed {
            return Err(PeerError::InvalidState {
                peer: self.peer.clone(),
                state: self.state,
                action,
            });
        }
        Ok(())
    }

    /// `Idle → AwaitingAnswer`: queues a `call_init` asking the peer to
    /// send its offer.
    ///
    /// # Errors
    /// [`PeerError::InvalidState`] unless the session is `Idle`.
    pub fn start(&mut self) -> Result<(), PeerError> {
        if self.state != NegotiationState::Idle {
            return Err(PeerError::InvalidState {
                peer: self.peer.clone(),
                state: self.state,
                action: "start",
            });
        }
        self.outbox.push_back(OutboundMessage::CallInit {
            recipient: self.peer.clone(),
        });
        self.advance(NegotiationState::AwaitingAnswer);
        Ok(())
    }

    /// Starts the offer → answer sequence on a background task.
    ///
    /// The task applies the offer, creates an answer and applies it, in
    /// that order, and reports back through the peer event channel:
    /// `RemoteDescriptionApplied` after the first step, `Negotiated` at
    /// the end. Nothing changes here until [`Self::on_negotiated`] sees
    /// the result, so a failed step leaves the session as it was.
    ///
    /// # Errors
    /// - [`PeerError::UnexpectedDescription`]: not an offer
    /// - [`PeerError::NegotiationInProgress`]: one is already running
    /// - [`PeerError::InvalidState`]: not `AwaitingAnswer`
    pub fn handle_offer(
        &mut self,
        offer: SessionDescription,
    ) -> Result<(), PeerError> {
        self.ensure_open("accept an offer")?;
        if offer.sdp_type != SdpType::Offer {
            return Err(PeerError::UnexpectedDescription {
                peer: self.peer.clone(),
                sdp_type: offer.sdp_type,
            });
        }
        if self.negotiating {
            return Err(PeerError::NegotiationInProgress(self.peer.clone()));
        }
        if self.state != NegotiationState::AwaitingAnswer {
            return Err(PeerError::InvalidState {
                peer: self.peer.clone(),
                state: self.state,
                action: "accept an offer",
            });
        }

        self.negotiating = true;
        let connection = Arc::clone(&self.connection);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = negotiate(connection.as_ref(), &events, offer).await;
            events.send(PeerEventKind::Negotiated(result));
        });
        Ok(())
    }

    /// The negotiation task applied the remote offer: flush the buffered
    /// candidates into the connection, in arrival order.
    pub async fn on_remote_description_applied(&mut self) {
        if self.state == NegotiationState::Closed {
            return;
        }
        self.remote_applied = true;
        let buffered = std::mem::take(&mut self.buffered);
        if !buffered.is_empty() {
            debug!(
                peer = %self.peer,
                count = buffered.len(),
                "flushing buffered remote candidates"
            );
        }
        let connection = Arc::clone(&self.connection);
        for candidate in buffered {
            add_to_connection(connection.as_ref(), &self.peer, candidate).await;
        }
    }

    /// The negotiation task finished.
    ///
    /// On success the answer is queued and the session moves to
    /// `Negotiating` (or straight on to `Connected` if media already
    /// arrived).
    ///
    /// # Errors
    /// Hands back the step failure. The session stays where it was and a
    /// later offer may retry.
    pub fn on_negotiated(
        &mut self,
        result: Result<SessionDescription, PeerError>,
    ) -> Result<(), PeerError> {
        self.negotiating = false;
        if self.state == NegotiationState::Closed {
            return Ok(());
        }
        let answer = result?;

        self.outbox.push_back(OutboundMessage::SdpAnswer {
            recipient: self.peer.clone(),
            description: answer,
        });
        self.advance(NegotiationState::Negotiating);
        info!(peer = %self.peer, "answer ready");
        if self.has_stream {
            self.advance(NegotiationState::Connected);
        }
        Ok(())
    }

    /// An inbound remote candidate.
    ///
    /// Added right away if a remote description is in place, buffered
    /// otherwise. A connection that rejects it is logged and ignored, as
    /// is a candidate that arrives while the buffer is full.
    pub async fn add_remote_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> CandidateDisposition {
        if self.state == NegotiationState::Closed {
            return CandidateDisposition::Dropped;
        }
        if !self.remote_applied {
            if self.buffered.len() >= Self::MAX_BUFFERED_CANDIDATES {
                warn!(
                    peer = %self.peer,
                    index = candidate.index,
                    limit = Self::MAX_BUFFERED_CANDIDATES,
                    "candidate buffer full, discarding candidate"
                );
                return CandidateDisposition::BufferFull;
            }
            debug!(
                peer = %self.peer,
                index = candidate.index,
                "no remote description yet, buffering candidate"
            );
            self.buffered.push(candidate);
            return CandidateDisposition::Buffered;
        }
        let connection = Arc::clone(&self.connection);
        add_to_connection(connection.as_ref(), &self.peer, candidate).await
    }

    /// A locally gathered candidate: queue it for the peer.
    pub fn on_local_candidate(&mut self, candidate: IceCandidate) {
        if self.state == NegotiationState::Closed || self.gathering_complete {
            debug!(peer = %self.peer, "dropping late local candidate");
            return;
        }
        self.outbox.push_back(OutboundMessage::IceCandidate {
            recipient: self.peer.clone(),
            candidate,
        });
    }

    pub fn on_gathering_complete(&mut self) {
        debug!(peer = %self.peer, "local candidate gathering complete");
        self.gathering_complete = true;
    }

    /// Media arrived: show it and, if our answer is out, move to
    /// `Connected`.
    pub fn on_track<V>(&mut self, stream: C::Stream, viewer: &mut V)
    where
        V: Viewer<C::Stream, Sink = K>,
    {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        viewer.show(sink, stream);
        self.has_stream = true;
        if self.state == NegotiationState::Negotiating {
            self.advance(NegotiationState::Connected);
            info!(peer = %self.peer, "media connected");
        }
    }

    /// `* → Closed`: releases the connection and hands back the sink.
    ///
    /// Pending outbound messages and buffered candidates are discarded.
    /// Closing twice is a no-op.
    pub async fn close(&mut self) -> Option<K> {
        if self.state == NegotiationState::Closed {
            return None;
        }
        self.advance(NegotiationState::Closed);
        self.outbox.clear();
        self.buffered.clear();
        if let Err(e) = self.connection.close().await {
            warn!(peer = %self.peer, error = %e, "failed to close connection");
        }
        info!(peer = %self.peer, "session closed");
        self.sink.take()
    }
}

/// Borrows only the connection and the peer id, never the session, so the
/// session's sink doesn't have to be `Sync` for this future to be `Send`.
async fn add_to_connection<C: PeerConnection>(
    connection: &C,
    peer: &PeerId,
    candidate: IceCandidate,
) -> CandidateDisposition {
    let index = candidate.index;
    match connection.add_ice_candidate(candidate).await {
        Ok(()) => CandidateDisposition::Added,
        Err(e) => {
            warn!(%peer, index, error = %e, "failed to add remote candidate");
            CandidateDisposition::Rejected
        }
    }
}

/// The offer → answer sequence. Each step must succeed before the next
/// starts; the first failure ends it.
async fn negotiate<C: PeerConnection>(
    connection: &C,
    events: &ConnectionEvents<C::Stream>,
    offer: SessionDescription,
) -> Result<SessionDescription, PeerError> {
    let fail = |step| {
        let peer = events.peer().clone();
        move |source| PeerError::Negotiation { peer, step, source }
    };

    connection
        .set_remote_description(offer)
        .await
        .map_err(fail(NegotiationStep::SetRemoteDescription))?;
    events.send(PeerEventKind::RemoteDescriptionApplied);

    let answer = connection
        .create_answer()
        .await
        .map_err(fail(NegotiationStep::CreateAnswer))?;

    connection
        .set_local_description(answer.clone())
        .await
        .map_err(fail(NegotiationStep::SetLocalDescription))?;

    Ok(answer)
}
