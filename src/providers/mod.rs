pub mod claude;
pub mod gemini;

pub use claude::ClaudeProvider;
pub use gemini::GeminiProvider;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::client::HttpReply;
use crate::error::RelayError;
use crate::{Conversation, InlineImage, RelayResult, Turn};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Chat session: history plus one new turn, roles `user` / `model`
    Gemini,
    /// Flat message list, roles `user` / `assistant`
    Claude,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Gemini => write!(f, "gemini"),
            ProviderKind::Claude => write!(f, "claude"),
        }
    }
}

/// One hosted model backend.
///
/// A relay call is `translate`, then `dispatch`, then `extract_text`; the
/// default [`ModelProvider::relay`] runs the three and folds any failure into
/// a [`RelayResult`]. Implementations keep no state between calls.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    type Payload: Serialize + Send + Sync;

    fn kind(&self) -> ProviderKind;

    fn model_name(&self) -> &str;

    /// Build the provider's request body from the whole conversation.
    fn translate(&self, conversation: &Conversation) -> Result<Self::Payload, RelayError>;

    /// Send the payload. Fails with `Configuration` before any I/O when the
    /// credential is missing.
    async fn dispatch(&self, payload: &Self::Payload) -> Result<HttpReply, RelayError>;

    /// Pull the answer text out of a reply, or the error it carries.
    fn extract_text(&self, reply: &HttpReply) -> Result<String, RelayError>;

    async fn relay(&self, conversation: &Conversation) -> RelayResult {
        info!(
            provider = %self.kind(),
            model = self.model_name(),
            turns = conversation.len(),
            "Relaying conversation"
        );
        let result = async {
            let payload = self.translate(conversation)?;
            let reply = self.dispatch(&payload).await?;
            self.extract_text(&reply)
        }
        .await;

        if let Err(e) = &result {
            warn!(provider = %self.kind(), "Relay failed: {}", e);
        }
        result.into()
    }
}

/// The configured backend. Exactly one is active per deployment.
pub enum GeneralModelProvider {
    Gemini(GeminiProvider),
    Claude(ClaudeProvider),
}

impl GeneralModelProvider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            GeneralModelProvider::Gemini(p) => p.kind(),
            GeneralModelProvider::Claude(p) => p.kind(),
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            GeneralModelProvider::Gemini(p) => p.model_name(),
            GeneralModelProvider::Claude(p) => p.model_name(),
        }
    }

    pub async fn relay(&self, conversation: &Conversation) -> RelayResult {
        match self {
            GeneralModelProvider::Gemini(p) => p.relay(conversation).await,
            GeneralModelProvider::Claude(p) => p.relay(conversation).await,
        }
    }
}

impl From<GeminiProvider> for GeneralModelProvider {
    fn from(provider: GeminiProvider) -> Self {
        GeneralModelProvider::Gemini(provider)
    }
}

impl From<ClaudeProvider> for GeneralModelProvider {
    fn from(provider: ClaudeProvider) -> Self {
        GeneralModelProvider::Claude(provider)
    }
}

/// Wire parts for one turn: images in their original order, then the caption
/// if there is one. Malformed images are dropped.
pub(crate) fn turn_parts<P>(
    turn: &Turn,
    image: impl Fn(InlineImage<'_>) -> P,
    text: impl FnOnce(&str) -> P,
) -> Vec<P> {
    let mut parts: Vec<P> = turn
        .images()
        .iter()
        .filter_map(|uri| match uri.decode() {
            Ok(inline) => Some(image(inline)),
            Err(e) => {
                debug!("Dropping image: {}", e);
                None
            }
        })
        .collect();

    if let Some(caption) = turn.caption() {
        parts.push(text(caption));
    }
    parts
}

/// Parse a reply body into `T`, turning error statuses and embedded error
/// objects into `Upstream` and unparseable bodies into `Transport`.
pub(crate) fn parse_reply<T: DeserializeOwned>(reply: &HttpReply) -> Result<T, RelayError> {
    let parsed = serde_json::from_str::<serde_json::Value>(&reply.body);

    if !reply.is_success() {
        let message = parsed
            .ok()
            .as_ref()
            .and_then(embedded_error)
            .unwrap_or_else(|| raw_error_body(reply));
        return Err(RelayError::Upstream(message));
    }

    let value = parsed?;
    if value.get("error").is_some_and(|e| !e.is_null()) {
        let message = embedded_error(&value).unwrap_or_else(|| reply.body.clone());
        return Err(RelayError::Upstream(message));
    }

    Ok(serde_json::from_value(value)?)
}

fn embedded_error(value: &serde_json::Value) -> Option<String> {
    match value.get("error")? {
        serde_json::Value::String(message) => Some(message.clone()),
        error => error
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string),
    }
}

fn raw_error_body(reply: &HttpReply) -> String {
    if reply.body.trim().is_empty() {
        format!("Request failed with status {}", reply.status)
    } else {
        reply.body.clone()
    }
}
