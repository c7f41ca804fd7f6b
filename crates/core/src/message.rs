//! Message and Conversation domain types.
//!
//! A conversation arrives as the `messages` array of a chat-completion
//! request and is the unit every pipeline invocation works on:
//! request body → Conversation → pipeline stages → formatted transcript.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Character sheets, scenario and rules
    System,
    /// The human participant
    User,
    /// The AI character
    Assistant,
}

impl Role {
    /// Parse a wire role name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content (empty when the request carried none)
    #[serde(default)]
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Whether the message has nothing worth rendering.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// An ordered sequence of messages, most recent last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Build a conversation from a raw `messages` JSON array.
    ///
    /// Elements without a recognized role are skipped. `content` may be a
    /// string, an array of `{ "type": "text", "text": ... }` parts, or
    /// missing.
    pub fn from_json(value: &Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::InvalidPayload("messages must be an array".into()))?;

        let mut messages = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let role = match item.get("role").and_then(Value::as_str).and_then(Role::parse) {
                Some(role) => role,
                None => {
                    debug!(index, "Skipping message without a system/user/assistant role");
                    continue;
                }
            };
            let content = item.get("content").map(content_text).unwrap_or_default();
            messages.push(Message { role, content });
        }

        Ok(Self { messages })
    }

    /// Messages with the given role, in conversation order.
    pub fn by_role(&self, role: Role) -> impl DoubleEndedIterator<Item = &Message> + '_ {
        self.messages.iter().filter(move |m| m.role == role)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

/// Flatten a message `content` value into plain text.
fn content_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| match part {
                Value::String(s) => Some(s.as_str()),
                Value::Object(_) => part.get("text").and_then(Value::as_str),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}
