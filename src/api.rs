use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{MalformedImageError, RelayError};

/// Text sent when the user submits images without a caption.
pub const DEFAULT_PROMPT: &str = "Where is this?";

/// Text returned when a provider answers but carries no usable text.
pub const NO_RESPONSE: &str = "No response";

static DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:(image/[A-Za-z0-9_]+);base64,(.+)$").expect("data URI pattern is valid")
});

#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// An inline image as the browser hands it over: a `data:` URI.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImageRef(String);

/// The two halves of a well-formed [`ImageRef`], borrowed from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InlineImage<'a> {
    pub mime_type: &'a str,
    pub data: &'a str,
}

impl ImageRef {
    pub fn new(data_uri: impl Into<String>) -> Self {
        ImageRef(data_uri.into())
    }

    pub fn from_base64(mime_type: &str, data: &str) -> Self {
        ImageRef(format!("data:{};base64,{}", mime_type, data))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the URI into MIME type and raw base64 payload.
    pub fn decode(&self) -> Result<InlineImage<'_>, MalformedImageError> {
        let captures = DATA_URI
            .captures(&self.0)
            .ok_or_else(|| MalformedImageError::new(&self.0))?;
        match (captures.get(1), captures.get(2)) {
            (Some(mime_type), Some(data)) => Ok(InlineImage {
                mime_type: mime_type.as_str(),
                data: data.as_str(),
            }),
            _ => Err(MalformedImageError::new(&self.0)),
        }
    }
}

/// One message of a conversation.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct Turn {
    role: Role,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<ImageRef>,
}

impl Turn {
    pub fn new(role: Role, text: Option<String>, images: Vec<ImageRef>) -> Self {
        Turn { role, text, images }
    }

    pub fn user(text: impl Into<String>, images: Vec<ImageRef>) -> Self {
        Self::new(Role::User, Some(text.into()), images)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Some(text.into()), Vec::new())
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The text, but only when it is non-empty.
    pub fn caption(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    pub fn has_content(&self) -> bool {
        self.caption().is_some() || !self.images.is_empty()
    }
}

/// Ordered, append-only history of turns.
///
/// Cloning is cheap: turns are shared, so appending to a clone never touches
/// the original.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<Arc<Turn>>,
}

/// A conversation split into prior context and the newest turn.
#[derive(Clone, Copy, Debug)]
pub struct RelayRequest<'a> {
    pub history: &'a [Arc<Turn>],
    pub current: &'a Turn,
}

impl<'a> RelayRequest<'a> {
    pub fn history(&self) -> impl Iterator<Item = &'a Turn> + 'a {
        self.history.iter().map(|turn| turn.as_ref())
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: impl IntoIterator<Item = Turn>) -> Self {
        Conversation {
            turns: turns.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().map(|turn| turn.as_ref())
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last().map(|turn| turn.as_ref())
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(Arc::new(turn));
    }

    /// A new conversation with `turn` appended; `self` is left as it was.
    pub fn with_turn(&self, turn: Turn) -> Conversation {
        let mut next = self.clone();
        next.push(turn);
        next
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// History is every turn but the last; the last is `current`.
    pub fn split(&self) -> Result<RelayRequest<'_>, RelayError> {
        let (current, history) = self
            .turns
            .split_last()
            .ok_or(RelayError::EmptyConversation)?;
        Ok(RelayRequest {
            history,
            current: current.as_ref(),
        })
    }
}

/// Outcome of one relay call: either answer text or an error message.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RelayResult {
    Ok { text: String },
    Error { error: String },
}

impl RelayResult {
    pub fn ok(text: impl Into<String>) -> Self {
        RelayResult::Ok { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        RelayResult::Error {
            error: message.into(),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            RelayResult::Ok { .. } => None,
            RelayResult::Error { error } => Some(error),
        }
    }

    /// The assistant turn a chat client appends for this outcome.
    pub fn into_turn(self) -> Turn {
        match self {
            RelayResult::Ok { text } => Turn::assistant(text),
            RelayResult::Error { error } => Turn::assistant(format!("Error: {}", error)),
        }
    }
}

impl From<Result<String, RelayError>> for RelayResult {
    fn from(result: Result<String, RelayError>) -> Self {
        match result {
            Ok(text) => RelayResult::ok(text),
            Err(e) => RelayResult::error(e.message()),
        }
    }
}
