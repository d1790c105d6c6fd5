use std::fmt;

/// Errors that end a relay call. Every variant is surfaced to the caller as
/// the `error` string of a [`crate::RelayResult`]; none of them is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// A required credential or setting is missing at call time
    Configuration(String),

    /// Provider answered with a non-success status or an embedded error object
    Upstream(String),

    /// Network failure or a response body that could not be parsed
    Transport(String),

    /// The conversation handed to the relay had no turns
    EmptyConversation,
}

impl RelayError {
    pub fn missing_setting(name: &str) -> Self {
        RelayError::Configuration(format!("{} is not set", name))
    }

    /// The bare message, without a category prefix. This is what callers see.
    pub fn message(&self) -> String {
        match self {
            RelayError::Configuration(msg)
            | RelayError::Upstream(msg)
            | RelayError::Transport(msg) => msg.clone(),
            RelayError::EmptyConversation => "No messages to analyze".to_string(),
        }
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            RelayError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            RelayError::Transport(msg) => write!(f, "Transport error: {}", msg),
            RelayError::EmptyConversation => write!(f, "No messages to analyze"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Transport(err.to_string())
    }
}

/// An image entry that is not a `data:image/<subtype>;base64,<payload>` URI.
///
/// Never fatal: translators skip the image and keep going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedImageError {
    preview: String,
}

impl MalformedImageError {
    pub(crate) fn new(raw: &str) -> Self {
        MalformedImageError {
            preview: raw.chars().take(32).collect(),
        }
    }
}

impl fmt::Display for MalformedImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Malformed image data URI: {:?}", self.preview)
    }
}

impl std::error::Error for MalformedImageError {}

/// Errors raised by [`crate::session::ChatSession`] before a relay call is made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Another submission is still in flight
    Busy,

    /// Neither text nor draft images were provided
    NothingToSend,

    /// Draft image index out of range
    NoSuchImage(usize),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Busy => write!(f, "A request is already in progress"),
            SessionError::NothingToSend => write!(f, "Nothing to send: add text or an image"),
            SessionError::NoSuchImage(index) => write!(f, "No draft image at position {}", index),
        }
    }
}

impl std::error::Error for SessionError {}
