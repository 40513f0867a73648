//! Connects to a relay, discovers the cameras behind it and logs every
//! step of the negotiation. There is no media stack behind it, so offers
//! are logged and then refused.
//!
//! ```text
//! LOOKOUT_EVENTS_URL=http://relay.local:8000/events \
//! LOOKOUT_RELAY_URL=http://relay.local:8000/message \
//! RUST_LOG=lookout=debug cargo run -p probe
//! ```

use lookout::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Media stand-in
// ---------------------------------------------------------------------------

struct ProbeConnector;

struct ProbeConnection {
    peer: PeerId,
}

impl PeerConnector for ProbeConnector {
    type Connection = ProbeConnection;

    async fn connect(
        &self,
        peer: &PeerId,
        _events: ConnectionEvents<()>,
    ) -> Result<ProbeConnection, MediaError> {
        info!(%peer, "opening probe connection");
        Ok(ProbeConnection { peer: peer.clone() })
    }
}

impl PeerConnection for ProbeConnection {
    type Stream = ();

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), MediaError> {
        info!(
            peer = %self.peer,
            sdp_type = %description.sdp_type,
            bytes = description.sdp.len(),
            "remote description"
        );
        Ok(())
    }

    async fn create_answer(&self) -> Result<SessionDescription, MediaError> {
        Err(MediaError::Failed("probe has no media stack".into()))
    }

    async fn set_local_description(&self, _: SessionDescription) -> Result<(), MediaError> {
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), MediaError> {
        info!(peer = %self.peer, index = candidate.index, candidate = %candidate.candidate, "remote candidate");
        Ok(())
    }

    async fn close(&self) -> Result<(), MediaError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Viewer
// ---------------------------------------------------------------------------

struct LogViewer;

impl Viewer<()> for LogViewer {
    type Sink = PeerId;

    fn create_sink(&mut self, peer: &PeerId) -> PeerId {
        info!(%peer, "camera discovered");
        peer.clone()
    }

    fn show(&mut self, sink: &mut PeerId, _stream: ()) {
        info!(peer = %sink, "stream arrived");
    }

    fn release_sink(&mut self, sink: PeerId) {
        info!(peer = %sink, "camera released");
    }

    fn connectivity_changed(&mut self, connected: bool) {
        info!(connected, "relay connectivity");
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

fn config_from_env() -> ClientConfig {
    let mut config = ClientConfig::default();
    if let Ok(url) = std::env::var("LOOKOUT_EVENTS_URL") {
        config.events_url = url;
    }
    if let Ok(url) = std::env::var("LOOKOUT_RELAY_URL") {
        config.relay_url = url;
    }
    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (client, handle) = ClientConfig::builder()
        .config(config_from_env())
        .build(ProbeConnector, LogViewer)?;
    let client = tokio::spawn(client.run());

    tokio::signal::ctrl_c().await?;
    let status = handle.status().await?;
    info!(connected = status.connected, cameras = status.peers.len(), "shutting down");
    for peer in &status.peers {
        info!(peer = %peer.peer, state = %peer.state, "camera");
    }
    handle.shutdown();
    client.await??;
    Ok(())
}
