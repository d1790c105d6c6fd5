pub mod api;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::debug;

use crate::client::{HttpReply, Transport};
use crate::error::RelayError;
use crate::prompt::GEOLOCATION_PROMPT;
use crate::providers::{ModelProvider, ProviderKind, parse_reply};
use crate::{Conversation, NO_RESPONSE, traffic_log};
use api::{MessagesRequest, MessagesResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const AUTH_TOKEN_ENV: &str = "ANTHROPIC_AUTH_TOKEN";
const API_VERSION: &str = "2023-06-01";

pub struct ClaudeProvider {
    transport: Arc<dyn Transport>,
    base_url: String,
    auth_token: Option<String>,
    model_name: String,
    max_tokens: u32,
    system: String,
}

impl ClaudeProvider {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: &str,
        auth_token: Option<String>,
        model_name: &str,
    ) -> Self {
        ClaudeProvider {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.filter(|token| !token.is_empty()),
            model_name: model_name.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system: GEOLOCATION_PROMPT.to_string(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system = instruction.into();
        self
    }

    fn url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn headers(&self) -> Result<HeaderMap, RelayError> {
        let token = self
            .auth_token
            .as_deref()
            .ok_or_else(|| RelayError::missing_setting(AUTH_TOKEN_ENV))?;
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| RelayError::Configuration(format!("{} is not a valid header value", AUTH_TOKEN_ENV)))?,
        );
        Ok(headers)
    }
}

#[async_trait]
impl ModelProvider for ClaudeProvider {
    type Payload = MessagesRequest;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn translate(&self, conversation: &Conversation) -> Result<Self::Payload, RelayError> {
        if conversation.is_empty() {
            return Err(RelayError::EmptyConversation);
        }
        Ok(MessagesRequest::from_conversation(
            &self.model_name,
            self.max_tokens,
            &self.system,
            conversation,
        ))
    }

    async fn dispatch(&self, payload: &Self::Payload) -> Result<HttpReply, RelayError> {
        let headers = self.headers()?;
        let body = serde_json::to_value(payload)?;
        traffic_log::log_request(&self.model_name, &body);

        match self.transport.post_json(&self.url(), headers, &body).await {
            Ok(reply) => {
                traffic_log::log_response(&self.model_name, reply.status, &reply.body);
                Ok(reply)
            }
            Err(e) => {
                traffic_log::log_error(&self.model_name, &e.to_string());
                Err(e)
            }
        }
    }

    fn extract_text(&self, reply: &HttpReply) -> Result<String, RelayError> {
        let response: MessagesResponse = parse_reply(reply)?;
        Ok(response.text().unwrap_or_else(|| {
            debug!(stop_reason = ?response.stop_reason, "Claude response carried no text blocks");
            NO_RESPONSE.to_string()
        }))
    }
}
