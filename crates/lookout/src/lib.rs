//! # Lookout
//!
//! Signaling client for a set of network cameras.
//!
//! Lookout subscribes to a relay server's event stream, discovers the
//! cameras behind it, and negotiates one media session per camera. The
//! media stack and the screen are supplied by the caller through
//! [`PeerConnector`](lookout_peer::PeerConnector) and
//! [`Viewer`](lookout_peer::Viewer); Lookout drives them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lookout::prelude::*;
//!
//! // Implement PeerConnector + PeerConnection for your media stack and
//! // Viewer for your UI, then:
//! // let (client, handle) = ClientConfig::builder()
//! //     .events_url("http://relay.local:8000/events")
//! //     .relay_url("http://relay.local:8000/message")
//! //     .build(my_connector, my_viewer)?;
//! // tokio::spawn(client.run());
//! ```

mod client;
mod config;
mod dispatch;
mod error;
mod signaling;

pub use client::{ClientHandle, ClientStatus, PeerStatus, SignalingClient};
pub use config::{ClientBuilder, ClientConfig};
pub use error::LookoutError;
pub use signaling::{SignalingTransport, TransportEvent};

/// Re-exports of the sub-crates, for callers that need the lower layers.
pub use lookout_peer as peer;
pub use lookout_protocol as protocol;
pub use lookout_transport as transport;

pub mod prelude {
    //! The types most callers need.

    pub use crate::{
        ClientBuilder, ClientConfig, ClientHandle, ClientStatus, LookoutError,
        SignalingClient,
    };
    pub use lookout_peer::{
        ConnectionEvents, MediaError, NegotiationState, PeerConnection,
        PeerConnector, Viewer,
    };
    pub use lookout_protocol::{IceCandidate, PeerId, SdpType, SessionDescription};
    pub use lookout_transport::BackoffConfig;
}
