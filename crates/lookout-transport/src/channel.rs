//! The event channel: one inbound subscription, reconnected with backoff.
//!
//! The channel runs on its own Tokio task and reports everything it sees
//! as [`ChannelEvent`]s, in arrival order, over an unbounded mpsc channel:
//!
//! ```text
//! subscribe ──ok──→ Connected, Message*, ... stream ends/fails
//!     │                                            │
//!     └──err──────────────┬────────────────────────┘
//!                         ▼
//!             Disconnected { retry_in } ── sleep(retry_in) ──→ subscribe
//! ```
//!
//! Every successful subscribe resets the backoff; every failure (or dropped
//! stream) emits exactly one `Disconnected` and doubles it. The failed
//! subscription is dropped before the sleep, so at most one subscription is
//! alive at any time.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{Backoff, Subscriber, Subscription};

/// What the event channel reports to its consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A subscription opened. Sent once per successful (re)connect.
    Connected,
    /// One raw event payload, undecoded.
    Message(String),
    /// The subscription failed or ended; the next attempt starts after
    /// `retry_in`.
    Disconnected {
        /// Delay before the next subscribe attempt.
        retry_in: Duration,
    },
}

/// Spawns and owns the reconnect loop.
///
/// ## Ownership
///
/// The loop task owns the [`Subscriber`], the current [`Subscription`]
/// and the [`Backoff`]. Nothing about them is shared with the consumer,
/// which only sees the event receiver and an [`EventChannelHandle`]. A
/// failed subscription is dropped before the backoff sleep starts, so the
/// old HTTP response is closed before the next one is opened.
///
/// ## Stopping
///
/// There is no "stop after N failures": the loop retries forever, with
/// the delay capped by the backoff. It ends only when
///
/// - [`EventChannelHandle::shutdown`] is called (or the handle dropped),
///   which also interrupts a pending sleep or a blocked read, or
/// - the event receiver is dropped, noticed on the next send.
///
/// ## Ordering
///
/// Events are sent from a single task over one mpsc channel, so the
/// consumer sees them in exactly the order they happened: a `Connected`
/// always precedes the messages of its subscription, and the matching
/// `Disconnected` follows them.
pub struct EventChannel;

impl EventChannel {
    /// Starts subscribing to `uri` on a new Tokio task.
    ///
    /// Returns the handle that controls the task and the receiver the
    /// events arrive on. The loop stops when the handle is shut down or
    /// dropped, or when the receiver is dropped.
    pub fn spawn<S: Subscriber>(
        subscriber: S,
        uri: impl Into<String>,
        backoff: Backoff,
    ) -> (EventChannelHandle, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let uri = uri.into();

        let task = tokio::spawn(run(
            subscriber,
            uri,
            backoff,
            events_tx,
            shutdown_rx,
        ));

        (
            EventChannelHandle {
                shutdown: Some(shutdown_tx),
                task,
            },
            events_rx,
        )
    }
}

/// Control handle for a running [`EventChannel`].
///
/// Dropping the handle stops the channel too.
pub struct EventChannelHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl EventChannelHandle {
    /// Stops the loop: closes the open subscription or cancels the
    /// pending reconnect sleep, then waits for the task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "event channel task ended abnormally");
        }
    }

    /// Returns `true` once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run<S: Subscriber>(
    subscriber: S,
    uri: String,
    mut backoff: Backoff,
    events: mpsc::UnboundedSender<ChannelEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        let attempt = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            attempt = subscriber.subscribe(&uri) => attempt,
        };

        match attempt {
            Ok(mut subscription) => {
                backoff.reset();
                info!(%uri, "connected to event stream");
                if events.send(ChannelEvent::Connected).is_err() {
                    break;
                }

                loop {
                    let next = tokio::select! {
                        biased;
                        _ = &mut shutdown => return stopped(&uri),
                        next = subscription.next_event() => next,
                    };
                    match next {
                        Ok(Some(raw)) => {
                            if events.send(ChannelEvent::Message(raw)).is_err()
                            {
                                return stopped(&uri);
                            }
                        }
                        Ok(None) => {
                            warn!(%uri, "event stream ended");
                            break;
                        }
                        Err(e) => {
                            warn!(%uri, error = %e, "event stream failed");
                            break;
                        }
                    }
                }
                drop(subscription);
            }
            Err(e) => {
                warn!(%uri, error = %e, "event stream subscribe failed");
            }
        }

        let retry_in = backoff.next_delay();
        info!(
            %uri,
            delay_secs = retry_in.as_secs(),
            "connection lost, attempting to reconnect"
        );
        if events
            .send(ChannelEvent::Disconnected { retry_in })
            .is_err()
        {
            break;
        }

        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(retry_in) => {}
        }
    }
    stopped(&uri);
}

fn stopped(uri: &str) {
    debug!(uri, "event channel stopped");
}
