pub mod api;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::client::{HttpReply, Transport};
use crate::error::RelayError;
use crate::prompt::GEOLOCATION_PROMPT;
use crate::providers::{ModelProvider, ProviderKind, parse_reply};
use crate::{Conversation, NO_RESPONSE, traffic_log};
use api::{ChatSession, GenerateContentRequest, GenerateContentResponse};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const API_KEY_ENV: &str = "GOOGLE_AI_API_KEY";

pub struct GeminiProvider {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: Option<String>,
    model_name: String,
    system_instruction: String,
}

impl GeminiProvider {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: &str,
        api_key: Option<String>,
        model_name: &str,
    ) -> Self {
        GeminiProvider {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
            model_name: model_name.to_string(),
            system_instruction: GEOLOCATION_PROMPT.to_string(),
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model_name)
    }

    fn headers(&self) -> Result<HeaderMap, RelayError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RelayError::missing_setting(API_KEY_ENV))?;
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|_| RelayError::Configuration(format!("{} is not a valid header value", API_KEY_ENV)))?,
        );
        Ok(headers)
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    type Payload = GenerateContentRequest;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn translate(&self, conversation: &Conversation) -> Result<Self::Payload, RelayError> {
        let session = ChatSession::from(conversation.split()?);
        debug!(
            history = session.history.len(),
            parts = session.current.len(),
            "Built Gemini chat session"
        );
        Ok(GenerateContentRequest::new(session, &self.system_instruction))
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
        let response: GenerateContentResponse = parse_reply(reply)?;
        match response.text() {
            Some(text) => Ok(text),
            None => {
                if let Some(reason) = response.block_reason() {
                    warn!(reason, "Gemini blocked the prompt");
                } else if let Some(reason) = response
                    .candidates
                    .first()
                    .and_then(|c| c.finish_reason.as_deref())
                {
                    debug!(reason, "Gemini candidate carried no text");
                }
                Ok(NO_RESPONSE.to_string())
            }
        }
    }
}
