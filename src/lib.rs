mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod prompt;
pub mod providers;
pub mod server;
pub mod session;
mod traffic_log;

pub use api::*;
pub use client::{Client, HttpReply, Transport};
pub use error::{MalformedImageError, RelayError, SessionError};
pub use providers::{ClaudeProvider, GeminiProvider, GeneralModelProvider, ModelProvider, ProviderKind};
pub use session::ChatSession;
