//! End-to-end tests for the signaling client.
//!
//! The event stream, the relay, the media stack and the viewer are all
//! scripted in-process. Every test runs with paused time, so backoff
//! sleeps resolve instantly and their lengths can be checked exactly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lookout::peer::{
    ConnectionEvents, MediaError, NegotiationState, NegotiationStep, PeerConnection,
    PeerConnector, PeerError, Viewer,
};
use lookout::protocol::{IceCandidate, OutboundMessage, PeerId, SessionDescription};
use lookout::transport::{BackoffConfig, Relay, Subscriber, Subscription, TransportError};
use lookout::{ClientConfig, ClientHandle, LookoutError, PeerStatus};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout};

// =========================================================================
// Scripted event stream
// =========================================================================

type StreamTx = mpsc::UnboundedSender<Result<String, TransportError>>;
type StreamRx = mpsc::UnboundedReceiver<Result<String, TransportError>>;
type Attempt = Result<StreamRx, TransportError>;

/// Each subscribe takes the next queued attempt; with none queued it
/// waits.
struct ScriptedSubscriber {
    attempts: tokio::sync::Mutex<mpsc::UnboundedReceiver<Attempt>>,
    subscribed_at: Arc<Mutex<Vec<Instant>>>,
}

struct ScriptedSubscription {
    events: StreamRx,
}

impl Subscriber for ScriptedSubscriber {
    type Subscription = ScriptedSubscription;

    async fn subscribe(&self, _uri: &str) -> Result<ScriptedSubscription, TransportError> {
        self.subscribed_at.lock().unwrap().push(Instant::now());
        let mut attempts = self.attempts.lock().await;
        match attempts.recv().await {
            Some(Ok(events)) => Ok(ScriptedSubscription { events }),
            Some(Err(e)) => Err(e),
            None => std::future::pending().await,
        }
    }
}

impl Subscription for ScriptedSubscription {
    async fn next_event(&mut self) -> Result<Option<String>, TransportError> {
        match self.events.recv().await {
            Some(Ok(raw)) => Ok(Some(raw)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

// =========================================================================
// Recording relay
// =========================================================================

struct RecordingRelay {
    sent: mpsc::UnboundedSender<OutboundMessage>,
    reject: Arc<AtomicBool>,
}

impl Relay for RecordingRelay {
    async fn post(&self, body: Vec<u8>) -> Result<(), TransportError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected(500));
        }
        let msg: OutboundMessage = serde_json::from_slice(&body)
            .map_err(|e| TransportError::ConnectionClosed(e.to_string()))?;
        let _ = self.sent.send(msg);
        Ok(())
    }
}

// =========================================================================
// Mock media stack and viewer
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
enum Call {
    SetRemote(SessionDescription),
    CreateAnswer,
    SetLocal(SessionDescription),
    AddCandidate(IceCandidate),
    Close,
}

#[derive(Clone, Default)]
struct Media {
    calls: Arc<Mutex<Vec<(PeerId, Call)>>>,
    events: Arc<Mutex<HashMap<PeerId, ConnectionEvents<String>>>>,
    fail_once: Arc<Mutex<Option<NegotiationStep>>>,
}

impl Media {
    fn calls_for(&self, peer: &str) -> Vec<Call> {
        let peer = PeerId::new(peer);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == peer)
            .map(|(_, call)| call.clone())
            .collect()
    }

    fn events(&self, peer: &str) -> ConnectionEvents<String> {
        self.events.lock().unwrap()[&PeerId::new(peer)].clone()
    }
}

struct MockConnector {
    media: Media,
}

struct MockConnection {
    peer: PeerId,
    media: Media,
}

impl MockConnection {
    fn record(&self, call: Call) {
        self.media.calls.lock().unwrap().push((self.peer.clone(), call));
    }

    fn step(&self, step: NegotiationStep) -> Result<(), MediaError> {
        let mut fail = self.media.fail_once.lock().unwrap();
        if *fail == Some(step) {
            *fail = None;
            return Err(MediaError::Failed(format!("{step} refused")));
        }
        Ok(())
    }
}

impl PeerConnector for MockConnector {
    type Connection = MockConnection;

    async fn connect(
        &self,
        peer: &PeerId,
        events: ConnectionEvents<String>,
    ) -> Result<MockConnection, MediaError> {
        self.media.events.lock().unwrap().insert(peer.clone(), events);
        Ok(MockConnection {
            peer: peer.clone(),
            media: self.media.clone(),
        })
    }
}

impl PeerConnection for MockConnection {
    type Stream = String;

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), MediaError> {
        self.record(Call::SetRemote(description));
        self.step(NegotiationStep::SetRemoteDescription)
    }

    async fn create_answer(&self) -> Result<SessionDescription, MediaError> {
        self.record(Call::CreateAnswer);
        self.step(NegotiationStep::CreateAnswer)?;
        Ok(SessionDescription::answer(format!("a=answer-{}", self.peer)))
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), MediaError> {
        self.record(Call::SetLocal(description));
        self.step(NegotiationStep::SetLocalDescription)
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), MediaError> {
        self.record(Call::AddCandidate(candidate));
        Ok(())
    }

    async fn close(&self) -> Result<(), MediaError> {
        self.record(Call::Close);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ViewerLog {
    sinks: Vec<PeerId>,
    shown: Vec<(PeerId, String)>,
    released: Vec<PeerId>,
    connectivity: Vec<bool>,
}

struct RecordingViewer {
    log: Arc<Mutex<ViewerLog>>,
}

impl Viewer<String> for RecordingViewer {
    type Sink = PeerId;

    fn create_sink(&mut self, peer: &PeerId) -> PeerId {
        self.log.lock().unwrap().sinks.push(peer.clone());
        peer.clone()
    }

    fn show(&mut self, sink: &mut PeerId, stream: String) {
        self.log.lock().unwrap().shown.push((sink.clone(), stream));
    }

    fn release_sink(&mut self, sink: PeerId) {
        self.log.lock().unwrap().released.push(sink);
    }

    fn connectivity_changed(&mut self, connected: bool) {
        self.log.lock().unwrap().connectivity.push(connected);
    }
}

// =========================================================================
// Harness
// =========================================================================

/// Long enough to outlast a full backoff ladder; time is paused anyway.
const WAIT: Duration = Duration::from_secs(600);

struct Harness {
    attempts: mpsc::UnboundedSender<Attempt>,
    subscribed_at: Arc<Mutex<Vec<Instant>>>,
    sent: mpsc::UnboundedReceiver<OutboundMessage>,
    reject: Arc<AtomicBool>,
    media: Media,
    viewer: Arc<Mutex<ViewerLog>>,
    handle: ClientHandle,
    task: JoinHandle<Result<(), LookoutError>>,
}

fn start() -> Harness {
    start_with(ClientConfig::default())
}

fn start_with(config: ClientConfig) -> Harness {
    let (attempts_tx, attempts_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let subscribed_at = Arc::new(Mutex::new(Vec::new()));
    let reject = Arc::new(AtomicBool::new(false));
    let media = Media::default();
    let viewer = Arc::new(Mutex::new(ViewerLog::default()));

    let (client, handle) = ClientConfig::builder()
        .config(config)
        .build_with(
            ScriptedSubscriber {
                attempts: tokio::sync::Mutex::new(attempts_rx),
                subscribed_at: Arc::clone(&subscribed_at),
            },
            RecordingRelay {
                sent: sent_tx,
                reject: Arc::clone(&reject),
            },
            MockConnector {
                media: media.clone(),
            },
            RecordingViewer {
                log: Arc::clone(&viewer),
            },
        )
        .unwrap();
    let task = tokio::spawn(client.run());

    Harness {
        attempts: attempts_tx,
        subscribed_at,
        sent: sent_rx,
        reject,
        media,
        viewer,
        handle,
        task,
    }
}

impl Harness {
    /// Queues a successful subscribe and returns the stream's sender.
    fn accept(&self) -> StreamTx {
        let (tx, rx) = mpsc::unbounded_channel();
        self.attempts.send(Ok(rx)).unwrap();
        tx
    }

    /// Queues a failed subscribe.
    fn refuse(&self) {
        self.attempts
            .send(Err(TransportError::SubscribeFailed("refused".into())))
            .unwrap();
    }

    /// Accepts a stream and consumes the discovery it triggers.
    async fn connect(&mut self) -> StreamTx {
        let stream = self.accept();
        assert_eq!(self.next_sent().await, OutboundMessage::Discovery);
        stream
    }

    async fn next_sent(&mut self) -> OutboundMessage {
        timeout(WAIT, self.sent.recv())
            .await
            .expect("nothing was sent")
            .expect("relay dropped")
    }

    async fn assert_quiet(&mut self) {
        let next = timeout(Duration::from_millis(100), self.sent.recv()).await;
        assert!(next.is_err(), "unexpected message: {next:?}");
    }

    async fn peers(&self) -> Vec<PeerStatus> {
        self.handle.status().await.unwrap().peers
    }

    fn subscribe_gaps(&self) -> Vec<Duration> {
        let times = self.subscribed_at.lock().unwrap();
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

fn push(stream: &StreamTx, payload: serde_json::Value) {
    stream.send(Ok(payload.to_string())).unwrap();
}

fn ping(stream: &StreamTx, sender: &str) {
    push(stream, json!({ "command": "camera_ping", "sender": sender }));
}

fn offer(stream: &StreamTx, sender: &str, sdp: &str) {
    push(
        stream,
        json!({ "command": "sdp_offer", "sender": sender, "sdp": sdp, "sdp_type": "offer" }),
    );
}

fn call_init(peer: &str) -> OutboundMessage {
    OutboundMessage::CallInit {
        recipient: PeerId::new(peer),
    }
}

fn status(peer: &str, state: NegotiationState) -> PeerStatus {
    PeerStatus {
        peer: PeerId::new(peer),
        state,
    }
}

// =========================================================================
// Connect and discovery
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_run_connect_sends_exactly_one_discovery() {
    let mut h = start();

    let _stream = h.accept();

    assert_eq!(h.next_sent().await, OutboundMessage::Discovery);
    h.assert_quiet().await;
    assert!(h.handle.status().await.unwrap().connected);
    assert_eq!(h.viewer.lock().unwrap().connectivity, vec![true]);
}

#[tokio::test(start_paused = true)]
async fn test_run_camera_ping_creates_one_session() {
    let mut h = start();
    let stream = h.connect().await;

    ping(&stream, "cam1");
    ping(&stream, "cam1");

    assert_eq!(h.next_sent().await, call_init("cam1"));
    h.assert_quiet().await;
    assert_eq!(
        h.peers().await,
        vec![status("cam1", NegotiationState::AwaitingAnswer)]
    );
    assert_eq!(h.viewer.lock().unwrap().sinks, vec![PeerId::new("cam1")]);
}

#[tokio::test(start_paused = true)]
async fn test_run_own_echo_is_ignored() {
    let mut h = start_with(ClientConfig {
        self_id: Some(PeerId::new("viewer")),
        ..ClientConfig::default()
    });
    let stream = h.connect().await;

    ping(&stream, "viewer");
    ping(&stream, "cam1");

    assert_eq!(h.next_sent().await, call_init("cam1"));
    assert_eq!(h.peers().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_unknown_and_malformed_payloads_are_dropped() {
    let mut h = start();
    let stream = h.connect().await;

    push(&stream, json!({ "command": "welcome", "sender": "server" }));
    stream.send(Ok("not json".into())).unwrap();
    push(&stream, json!({ "command": "sdp_offer", "sender": "cam1" }));
    push(
        &stream,
        json!({ "command": "ice_candidate", "sender": "cam1", "index": 70000, "candidate": "c" }),
    );
    ping(&stream, "cam1");

    assert_eq!(h.next_sent().await, call_init("cam1"));
    assert_eq!(
        h.peers().await,
        vec![status("cam1", NegotiationState::AwaitingAnswer)]
    );
    assert!(!h.task.is_finished());
}

// =========================================================================
// Negotiation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_run_offer_is_answered_after_all_steps() {
    let mut h = start();
    let stream = h.connect().await;
    ping(&stream, "cam1");
    h.next_sent().await;

    offer(&stream, "cam1", "o=offer");

    let answer = SessionDescription::answer("a=answer-cam1");
    assert_eq!(
        h.next_sent().await,
        OutboundMessage::SdpAnswer {
            recipient: PeerId::new("cam1"),
            description: answer.clone(),
        }
    );
    assert_eq!(
        h.media.calls_for("cam1"),
        vec![
            Call::SetRemote(SessionDescription::offer("o=offer")),
            Call::CreateAnswer,
            Call::SetLocal(answer),
        ]
    );
    assert_eq!(
        h.peers().await,
        vec![status("cam1", NegotiationState::Negotiating)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_stream_arrival_connects_session() {
    let mut h = start();
    let stream = h.connect().await;
    ping(&stream, "cam1");
    h.next_sent().await;
    offer(&stream, "cam1", "o");
    h.next_sent().await;

    h.media.events("cam1").track("video".into());

    let mut state = NegotiationState::Negotiating;
    for _ in 0..50 {
        state = h.peers().await[0].state;
        if state == NegotiationState::Connected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(state, NegotiationState::Connected);
    assert_eq!(
        h.viewer.lock().unwrap().shown,
        vec![(PeerId::new("cam1"), "video".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_failed_negotiation_is_retryable() {
    let mut h = start();
    let stream = h.connect().await;
    ping(&stream, "cam1");
    h.next_sent().await;
    *h.media.fail_once.lock().unwrap() = Some(NegotiationStep::CreateAnswer);

    offer(&stream, "cam1", "first");
    h.assert_quiet().await;
    assert_eq!(
        h.peers().await,
        vec![status("cam1", NegotiationState::AwaitingAnswer)]
    );

    offer(&stream, "cam1", "second");
    assert!(matches!(
        h.next_sent().await,
        OutboundMessage::SdpAnswer { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_run_candidate_reaches_connection_verbatim() {
    let mut h = start();
    let stream = h.connect().await;
    ping(&stream, "cam1");
    h.next_sent().await;
    offer(&stream, "cam1", "o");
    h.next_sent().await;

    let raw = "candidate:1 1 UDP 2122260223 192.168.1.20 54400 typ host";
    push(
        &stream,
        json!({ "command": "ice_candidate", "sender": "cam1", "index": 2, "candidate": raw }),
    );
    // Same stream, so once cam2 is answered the candidate was handled.
    ping(&stream, "cam2");
    assert_eq!(h.next_sent().await, call_init("cam2"));

    assert!(
        h.media
            .calls_for("cam1")
            .contains(&Call::AddCandidate(IceCandidate::new(2, raw)))
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_candidate_before_offer_is_applied_after_it() {
    let mut h = start();
    let stream = h.connect().await;
    ping(&stream, "cam1");
    h.next_sent().await;

    push(
        &stream,
        json!({ "command": "ice_candidate", "sender": "cam1", "index": 0, "candidate": "candidate:early" }),
    );
    offer(&stream, "cam1", "o");
    h.next_sent().await;
    ping(&stream, "cam2");
    h.next_sent().await;

    let calls = h.media.calls_for("cam1");
    let set_remote = calls
        .iter()
        .position(|c| matches!(c, Call::SetRemote(_)))
        .unwrap();
    let added = calls
        .iter()
        .position(|c| *c == Call::AddCandidate(IceCandidate::new(0, "candidate:early")))
        .unwrap();
    assert!(added > set_remote);
}

#[tokio::test(start_paused = true)]
async fn test_run_candidate_for_unknown_peer_is_dropped() {
    let mut h = start();
    let stream = h.connect().await;

    push(
        &stream,
        json!({ "command": "ice_candidate", "sender": "ghost", "index": 2, "candidate": "candidate:x" }),
    );
    offer(&stream, "ghost", "o");
    ping(&stream, "cam1");

    assert_eq!(h.next_sent().await, call_init("cam1"));
    assert!(h.media.calls_for("ghost").is_empty());
    assert_eq!(h.peers().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_local_candidates_are_sent_to_peer() {
    let mut h = start();
    let stream = h.connect().await;
    ping(&stream, "cam1");
    h.next_sent().await;

    h.media
        .events("cam1")
        .local_candidate(IceCandidate::new(0, "candidate:local"));

    assert_eq!(
        h.next_sent().await,
        OutboundMessage::IceCandidate {
            recipient: PeerId::new("cam1"),
            candidate: IceCandidate::new(0, "candidate:local"),
        }
    );
}

// =========================================================================
// Reconnect
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_run_reconnect_backs_off_and_rediscovers() {
    let mut h = start();
    let first = h.connect().await;
    h.refuse();
    h.refuse();
    h.refuse();
    let _second = h.accept();

    drop(first);

    assert_eq!(h.next_sent().await, OutboundMessage::Discovery);
    assert_eq!(
        h.subscribe_gaps()[1..],
        [
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(8),
        ]
    );
    assert_eq!(h.viewer.lock().unwrap().connectivity, vec![true, false, true]);
}

#[tokio::test(start_paused = true)]
async fn test_run_reconnect_waits_one_second_after_a_drop() {
    let mut h = start();
    let first = h.connect().await;
    let _second = h.accept();

    let dropped_at = Instant::now();
    drop(first);

    assert_eq!(h.next_sent().await, OutboundMessage::Discovery);
    let resubscribed_at = h.subscribed_at.lock().unwrap()[1];
    assert_eq!(resubscribed_at - dropped_at, Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_run_disconnect_keeps_sessions() {
    let mut h = start();
    let first = h.connect().await;
    ping(&first, "cam1");
    h.next_sent().await;
    let second = h.accept();

    drop(first);
    assert_eq!(h.next_sent().await, OutboundMessage::Discovery);

    ping(&second, "cam1");
    h.assert_quiet().await;
    assert_eq!(
        h.peers().await,
        vec![status("cam1", NegotiationState::AwaitingAnswer)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_relay_failure_is_not_fatal() {
    let mut h = start();
    h.reject.store(true, Ordering::SeqCst);
    let stream = h.accept();
    ping(&stream, "cam1");
    h.assert_quiet().await;

    h.reject.store(false, Ordering::SeqCst);
    ping(&stream, "cam2");

    assert_eq!(h.next_sent().await, call_init("cam2"));
    assert_eq!(h.peers().await.len(), 2);
}

// =========================================================================
// Control handle
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_teardown_closes_session_and_allows_rediscovery() {
    let mut h = start();
    let stream = h.connect().await;
    ping(&stream, "cam1");
    h.next_sent().await;

    h.handle.teardown("cam1").await.unwrap();

    assert!(h.peers().await.is_empty());
    assert_eq!(h.media.calls_for("cam1"), vec![Call::Close]);
    assert_eq!(h.viewer.lock().unwrap().released, vec![PeerId::new("cam1")]);

    ping(&stream, "cam1");
    assert_eq!(h.next_sent().await, call_init("cam1"));
}

#[tokio::test(start_paused = true)]
async fn test_teardown_unknown_peer_fails() {
    let h = start();

    let result = h.handle.teardown("ghost").await;

    assert!(matches!(
        result,
        Err(LookoutError::Peer(PeerError::NotFound(_)))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_sessions_and_stops() {
    let mut h = start();
    let stream = h.connect().await;
    ping(&stream, "cam1");
    h.next_sent().await;

    h.handle.shutdown();
    h.task.await.unwrap().unwrap();

    assert_eq!(h.media.calls_for("cam1"), vec![Call::Close]);
    assert_eq!(h.viewer.lock().unwrap().released, vec![PeerId::new("cam1")]);
    assert!(h.handle.is_stopped());
    assert!(matches!(h.handle.status().await, Err(LookoutError::Stopped)));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_reconnecting() {
    let h = start();
    h.refuse();

    h.handle.shutdown();

    timeout(WAIT, h.task).await.unwrap().unwrap().unwrap();
}

// =========================================================================
// Sink bounds
// =========================================================================

/// Renders through a boxed callback, which is `Send` but not `Sync`.
struct CallbackViewer {
    frames: Arc<Mutex<Vec<String>>>,
}

impl Viewer<String> for CallbackViewer {
    type Sink = Box<dyn FnMut(String) + Send>;

    fn create_sink(&mut self, _peer: &PeerId) -> Self::Sink {
        let frames = Arc::clone(&self.frames);
        Box::new(move |frame| frames.lock().unwrap().push(frame))
    }

    fn show(&mut self, sink: &mut Self::Sink, stream: String) {
        sink(stream);
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_spawns_with_send_only_sink() {
    let (attempts, attempts_rx) = mpsc::unbounded_channel();
    let (sent_tx, mut sent) = mpsc::unbounded_channel();
    let media = Media::default();
    let frames = Arc::new(Mutex::new(Vec::new()));
    let (client, handle) = ClientConfig::builder()
        .build_with(
            ScriptedSubscriber {
                attempts: tokio::sync::Mutex::new(attempts_rx),
                subscribed_at: Arc::default(),
            },
            RecordingRelay {
                sent: sent_tx,
                reject: Arc::default(),
            },
            MockConnector {
                media: media.clone(),
            },
            CallbackViewer {
                frames: Arc::clone(&frames),
            },
        )
        .unwrap();
    let task = tokio::spawn(client.run());

    let (stream, rx) = mpsc::unbounded_channel();
    attempts.send(Ok(rx)).unwrap();
    assert_eq!(sent.recv().await, Some(OutboundMessage::Discovery));
    ping(&stream, "cam1");
    assert_eq!(sent.recv().await, Some(call_init("cam1")));
    push(
        &stream,
        json!({ "command": "ice_candidate", "sender": "cam1", "index": 0, "candidate": "candidate:early" }),
    );
    offer(&stream, "cam1", "o");
    assert!(matches!(
        sent.recv().await,
        Some(OutboundMessage::SdpAnswer { .. })
    ));

    media.events("cam1").track("video".into());
    let mut state = NegotiationState::Negotiating;
    for _ in 0..50 {
        state = handle.status().await.unwrap().peers[0].state;
        if state == NegotiationState::Connected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(state, NegotiationState::Connected);
    assert_eq!(*frames.lock().unwrap(), vec!["video".to_string()]);
    assert!(
        media
            .calls_for("cam1")
            .contains(&Call::AddCandidate(IceCandidate::new(0, "candidate:early")))
    );

    handle.shutdown();
    task.await.unwrap().unwrap();
}

#[test]
fn test_build_rejects_bad_backoff() {
    let (_attempts, attempts_rx) = mpsc::unbounded_channel();
    let (sent, _sent_rx) = mpsc::unbounded_channel();
    let result = ClientConfig::builder()
        .backoff(BackoffConfig {
            initial: Duration::from_millis(10),
            max: Duration::from_secs(64),
        })
        .build_with(
            ScriptedSubscriber {
                attempts: tokio::sync::Mutex::new(attempts_rx),
                subscribed_at: Arc::default(),
            },
            RecordingRelay {
                sent,
                reject: Arc::default(),
            },
            MockConnector {
                media: Media::default(),
            },
            RecordingViewer {
                log: Arc::default(),
            },
        );

    assert!(matches!(
        result,
        Err(LookoutError::Transport(TransportError::InvalidConfig(_)))
    ));
}
