use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tracing::{Level, event, instrument};

use crate::error::RelayError;

/// Status and body of an upstream HTTP reply, read in full.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        HttpReply {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The one place a relay call touches the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &serde_json::Value,
    ) -> Result<HttpReply, RelayError>;
}

/// reqwest-backed transport. No timeout is set; the client default applies.
#[derive(Clone, Default)]
pub struct Client {
    client: reqwest::Client,
}

impl Client {
    pub fn new() -> Self {
        Client {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Transport for Client {
    #[instrument(level = "trace", skip(self, headers, body))]
    async fn post_json(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &serde_json::Value,
    ) -> Result<HttpReply, RelayError> {
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        event!(Level::TRACE, status, response = text);

        Ok(HttpReply { status, body: text })
    }
}
