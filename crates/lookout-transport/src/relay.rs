//! HTTP relay sender using `reqwest`.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use crate::{Relay, TransportError};

/// Posts each outbound payload to a single relay endpoint.
#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: reqwest::Client,
    url: String,
}

impl HttpRelay {
    /// Total timeout for one relay request.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Builds a relay sender for `url`.
    ///
    /// # Errors
    /// Returns [`TransportError::Http`] if the HTTP client can't be built.
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, url))
    }

    /// Uses an existing client.
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// The endpoint payloads are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Relay for HttpRelay {
    async fn post(&self, body: Vec<u8>) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Rejected(status.as_u16()));
        }
        tracing::trace!(url = %self.url, %status, "relay accepted message");
        Ok(())
    }
}
