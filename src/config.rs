//! Environment and command-line configuration
//!
//! Every setting can come from the environment (optionally via `.env`) or a
//! flag. Credentials stay optional here: a missing one only fails the relay
//! call that needs it.

use std::sync::Arc;

use clap::Args;

use crate::client::Transport;
use crate::prompt::GEOLOCATION_PROMPT;
use crate::providers::{ClaudeProvider, GeminiProvider, GeneralModelProvider, ProviderKind, claude, gemini};

/// Load `.env` from the working directory, if present. Existing environment
/// variables win. Call this before parsing CLI args.
pub fn load_env_file() {
    dotenv::dotenv().ok();
}

#[derive(Args, Clone, Debug, Default)]
pub struct RelayConfig {
    /// Backend to relay to; picked from the configured credentials when unset
    #[arg(long, env = "RELAY_PROVIDER", value_enum)]
    pub provider: Option<ProviderKind>,

    /// Gemini API key
    #[arg(long, env = gemini::API_KEY_ENV, hide_env_values = true)]
    pub google_api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = gemini::DEFAULT_MODEL)]
    pub gemini_model: String,

    #[arg(long, env = "GEMINI_BASE_URL", default_value = gemini::DEFAULT_BASE_URL)]
    pub gemini_base_url: String,

    /// Anthropic auth token, sent as a bearer token
    #[arg(long, env = claude::AUTH_TOKEN_ENV, hide_env_values = true)]
    pub anthropic_auth_token: Option<String>,

    #[arg(long, env = "ANTHROPIC_MODEL", default_value = claude::DEFAULT_MODEL)]
    pub anthropic_model: String,

    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = claude::DEFAULT_BASE_URL)]
    pub anthropic_base_url: String,

    #[arg(long, env = "ANTHROPIC_MAX_TOKENS", default_value_t = claude::DEFAULT_MAX_TOKENS)]
    pub anthropic_max_tokens: u32,

    /// Replaces the built-in geolocation system prompt
    #[arg(long, env = "RELAY_SYSTEM_PROMPT")]
    pub system_prompt: Option<String>,
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl RelayConfig {
    /// The explicit choice, else Claude when only its token is set, else Gemini.
    pub fn provider_kind(&self) -> ProviderKind {
        match self.provider {
            Some(kind) => kind,
            None if is_set(&self.anthropic_auth_token) && !is_set(&self.google_api_key) => {
                ProviderKind::Claude
            }
            None => ProviderKind::Gemini,
        }
    }

    fn system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .filter(|prompt| !prompt.trim().is_empty())
            .unwrap_or(GEOLOCATION_PROMPT)
    }

    pub fn build_provider(&self, transport: Arc<dyn Transport>) -> GeneralModelProvider {
        match self.provider_kind() {
            ProviderKind::Gemini => GeminiProvider::new(
                transport,
                &self.gemini_base_url,
                self.google_api_key.clone(),
                &self.gemini_model,
            )
            .with_system_instruction(self.system_prompt())
            .into(),
            ProviderKind::Claude => ClaudeProvider::new(
                transport,
                &self.anthropic_base_url,
                self.anthropic_auth_token.clone(),
                &self.anthropic_model,
            )
            .with_max_tokens(self.anthropic_max_tokens)
            .with_system_instruction(self.system_prompt())
            .into(),
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind to
    #[arg(short = 'H', long, env = "RELAY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on (0 for random)
    #[arg(short, long, env = "RELAY_PORT", default_value_t = 3000)]
    pub port: u16,
}
