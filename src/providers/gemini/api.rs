use serde::{Deserialize, Serialize};

use crate::providers::turn_parts;
use crate::{RelayRequest, Turn};

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl From<crate::Role> for Role {
    fn from(value: crate::Role) -> Self {
        match value {
            crate::Role::User => Role::User,
            crate::Role::Assistant => Role::Model,
        }
    }
}

/// Gemini inline data for images
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub(crate) mime_type: String,
    pub(crate) data: String, // base64-encoded
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum Part {
    Text(String),
    InlineData(InlineData),
}

pub(crate) fn parts_for_turn(turn: &Turn) -> Vec<Part> {
    turn_parts(
        turn,
        |inline| {
            Part::InlineData(InlineData {
                mime_type: inline.mime_type.to_string(),
                data: inline.data.to_string(),
            })
        },
        |text| Part::Text(text.to_string()),
    )
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct Content {
    pub(crate) role: Role,
    pub(crate) parts: Vec<Part>,
}

impl From<&Turn> for Content {
    fn from(turn: &Turn) -> Self {
        Content {
            role: turn.role().into(),
            parts: parts_for_turn(turn),
        }
    }
}

/// A chat session as Gemini models it: prior turns plus the message being sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ChatSession {
    pub(crate) history: Vec<Content>,
    pub(crate) current: Vec<Part>,
}

impl From<RelayRequest<'_>> for ChatSession {
    fn from(request: RelayRequest<'_>) -> Self {
        ChatSession {
            history: request.history().map(Content::from).collect(),
            current: parts_for_turn(request.current),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct SystemInstruction {
    pub(crate) parts: Vec<Part>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub(crate) contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) system_instruction: Option<SystemInstruction>,
}

impl GenerateContentRequest {
    /// Replays the session history and appends the current message as a user turn.
    pub(crate) fn new(session: ChatSession, system_instruction: &str) -> Self {
        let mut contents = session.history;
        contents.push(Content {
            role: Role::User,
            parts: session.current,
        });

        GenerateContentRequest {
            contents,
            system_instruction: if system_instruction.is_empty() {
                None
            } else {
                Some(SystemInstruction {
                    parts: vec![Part::Text(system_instruction.to_string())],
                })
            },
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct ResponsePart {
    pub(crate) text: Option<String>,

    #[serde(default)]
    pub(crate) thought: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct ResponseContent {
    #[serde(default)]
    pub(crate) parts: Vec<ResponsePart>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    pub(crate) content: Option<ResponseContent>,

    pub(crate) finish_reason: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    pub(crate) block_reason: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub(crate) candidates: Vec<Candidate>,

    pub(crate) prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Text parts of the first candidate, concatenated. Thought parts are skipped.
    pub(crate) fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .as_ref()?
            .parts
            .iter()
            .filter(|part| !part.thought)
            .filter_map(|part| part.text.as_deref())
            .collect();

        if text.is_empty() { None } else { Some(text) }
    }

    pub(crate) fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
    }
}
