use serde::{Deserialize, Serialize};

use crate::providers::turn_parts;
use crate::{Conversation, Turn};

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl From<crate::Role> for Role {
    fn from(value: crate::Role) -> Self {
        match value {
            crate::Role::User => Role::User,
            crate::Role::Assistant => Role::Assistant,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ImageSource {
    Base64 { media_type: String, data: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum Content {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct InputMessage {
    pub(crate) role: Role,
    pub(crate) content: Vec<Content>,
}

impl From<&Turn> for InputMessage {
    fn from(turn: &Turn) -> Self {
        let content = turn_parts(
            turn,
            |inline| Content::Image {
                source: ImageSource::Base64 {
                    media_type: inline.mime_type.to_string(),
                    data: inline.data.to_string(),
                },
            },
            |text| Content::Text {
                text: text.to_string(),
            },
        );

        InputMessage {
            role: turn.role().into(),
            content,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MessagesRequest {
    pub(crate) model: String,

    pub(crate) max_tokens: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) system: Option<String>,

    pub(crate) messages: Vec<InputMessage>,
}

impl MessagesRequest {
    pub(crate) fn from_conversation(
        model_name: &str,
        max_tokens: u32,
        system: &str,
        conversation: &Conversation,
    ) -> Self {
        MessagesRequest {
            model: model_name.to_string(),
            max_tokens,
            system: if system.is_empty() {
                None
            } else {
                Some(system.to_string())
            },
            messages: conversation.iter().map(InputMessage::from).collect(),
        }
    }
}

/// A response content block. Only `text` blocks carry answer text.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ResponseBlock {
    #[serde(rename = "type")]
    pub(crate) kind: String,

    pub(crate) text: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct MessagesResponse {
    #[serde(default)]
    pub(crate) content: Vec<ResponseBlock>,

    pub(crate) stop_reason: Option<String>,
}

impl MessagesResponse {
    /// All `text` blocks in order, joined without a separator.
    pub(crate) fn text(&self) -> Option<String> {
        let text: String = self
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        if text.is_empty() { None } else { Some(text) }
    }
}
