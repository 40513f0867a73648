//! Server-sent events: an incremental parser and a `reqwest` subscriber.
//!
//! The parser only cares about `data:` fields. Every blank line ends an
//! event; the event's `data:` lines are joined with `\n` and handed out as
//! one raw string. Comments (`:ping`), `event:`, `id:` and `retry:` are
//! skipped.

use tracing::warn;

/// Incremental `text/event-stream` parser.
///
/// Bytes may be pushed in arbitrary chunks; a line (or a UTF-8 sequence)
/// split across two chunks is held until the rest arrives. A line longer
/// than [`Self::MAX_LINE_LEN`] is discarded up to its newline, and so is
/// an event whose joined data grows past the same limit.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    data: Option<String>,
    /// Skipping the rest of an oversized line.
    skip_line: bool,
    /// Skipping the rest of an oversized event.
    skip_event: bool,
}

impl SseParser {
    /// Longest line, and longest event, the parser will hold.
    pub const MAX_LINE_LEN: usize = 1024 * 1024;

    /// Creates an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every event it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut events = Vec::new();
        let mut rest = chunk;
        while let Some(end) = rest.iter().position(|b| *b == b'\n') {
            let (line, tail) = rest.split_at(end);
            rest = &tail[1..];
            if std::mem::take(&mut self.skip_line) {
                continue;
            }
            if self.buffer.len() + line.len() > Self::MAX_LINE_LEN {
                self.drop_line();
                continue;
            }
            self.buffer.extend_from_slice(line);
            let raw = std::mem::take(&mut self.buffer);
            let text = String::from_utf8_lossy(&raw);
            let line = text.strip_suffix('\r').unwrap_or(text.as_ref());
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }

        if !self.skip_line {
            if self.buffer.len() + rest.len() > Self::MAX_LINE_LEN {
                // No newline yet: drop what we hold and skip up to it.
                self.drop_line();
                self.skip_line = true;
            } else {
                self.buffer.extend_from_slice(rest);
            }
        }
        events
    }

    fn drop_line(&mut self) {
        warn!(
            limit = Self::MAX_LINE_LEN,
            "event stream line too long, discarding it"
        );
        self.buffer = Vec::new();
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if std::mem::take(&mut self.skip_event) {
                return None;
            }
            return self.data.take();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => {
                (field, value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        if field == "data" && !self.skip_event {
            let held = self.data.as_ref().map_or(0, |data| data.len() + 1);
            if held + value.len() > Self::MAX_LINE_LEN {
                warn!(
                    limit = Self::MAX_LINE_LEN,
                    "event stream event too long, discarding it"
                );
                self.data = None;
                self.skip_event = true;
                return None;
            }
            match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// SseSubscriber
// ---------------------------------------------------------------------------

#[cfg(feature = "http")]
pub use http::{SseSubscriber, SseSubscription};

#[cfg(feature = "http")]
mod http {
    use std::collections::VecDeque;
    use std::time::Duration;

    use futures_util::stream::BoxStream;
    use futures_util::StreamExt;
    use reqwest::header::{ACCEPT, CACHE_CONTROL};

    use super::SseParser;
    use crate::{Subscriber, Subscription, TransportError};

    /// Opens event streams with `reqwest`.
    #[derive(Debug, Clone)]
    pub struct SseSubscriber {
        client: reqwest::Client,
    }

    impl SseSubscriber {
        /// Connect timeout for each subscription attempt. The stream itself
        /// is long-lived, so no total request timeout is set.
        pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

        /// Builds a subscriber with its own HTTP client.
        ///
        /// # Errors
        /// Returns [`TransportError::Http`] if the client can't be built
        /// (e.g. the TLS backend fails to initialize).
        pub fn new() -> Result<Self, TransportError> {
            let client = reqwest::Client::builder()
                .connect_timeout(Self::CONNECT_TIMEOUT)
                .build()?;
            Ok(Self { client })
        }

        /// Uses an existing client, e.g. one shared with the relay.
        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl Subscriber for SseSubscriber {
        type Subscription = SseSubscription;

        async fn subscribe(
            &self,
            uri: &str,
        ) -> Result<SseSubscription, TransportError> {
            let response = self
                .client
                .get(uri)
                .header(ACCEPT, "text/event-stream")
                .header(CACHE_CONTROL, "no-cache")
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::SubscribeFailed(format!(
                    "{uri} answered {status}"
                )));
            }

            tracing::debug!(uri, "event stream opened");
            let stream = response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                .boxed();

            Ok(SseSubscription {
                stream,
                parser: SseParser::new(),
                ready: VecDeque::new(),
            })
        }
    }

    /// One open event stream. Dropping it closes the HTTP response.
    pub struct SseSubscription {
        stream: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
        parser: SseParser,
        ready: VecDeque<String>,
    }

    impl Subscription for SseSubscription {
        async fn next_event(
            &mut self,
        ) -> Result<Option<String>, TransportError> {
            loop {
                if let Some(event) = self.ready.pop_front() {
                    return Ok(Some(event));
                }
                match self.stream.next().await {
                    Some(Ok(chunk)) => {
                        self.ready.extend(self.parser.push(&chunk));
                    }
                    Some(Err(e)) => {
                        return Err(TransportError::ReceiveFailed(
                            e.to_string(),
                        ));
                    }
                    None => return Ok(None),
                }
            }
        }
    }
}
