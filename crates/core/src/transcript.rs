//! Transcript formatting: renders a conversation for the per-character logs.
//!
//! Each non-blank message becomes one section:
//!
//! ```text
//! ### USER MESSAGE ###
//! {{user}}: hi Nova
//! ========================================
//! ```
//!
//! System messages are re-emitted block by block as `<label>\n...\n</label>`,
//! assistant messages are wrapped in `<firstmessage>`, and every piece of
//! content goes through newline unescaping and the anonymizer.

use crate::anonymize::Anonymizer;
use crate::message::{Conversation, Message, Role};
use crate::tags;

/// Rule closing every section.
pub const SECTION_RULE: &str = "========================================";

const ASSISTANT_ENVELOPE: &str = "firstmessage";

/// Banner line that opens a section for `role`.
pub fn banner(role: Role) -> &'static str {
    match role {
        Role::System => "### SYSTEM MESSAGE ###",
        Role::User => "### USER MESSAGE ###",
        Role::Assistant => "### ASSISTANT MESSAGE ###",
    }
}

/// Turn literal `\n` / `\r\n` escape sequences into real line breaks.
pub fn unescape_newlines(text: &str) -> String {
    text.replace("\\r\\n", "\n").replace("\\n", "\n")
}

/// Renders conversations with a fixed user entity.
pub struct TranscriptFormatter {
    anonymizer: Anonymizer,
}

impl TranscriptFormatter {
    pub fn new(user_entity: Option<&str>) -> Self {
        Self {
            anonymizer: Anonymizer::new(user_entity),
        }
    }

    /// Render the whole conversation.
    pub fn format(&self, conversation: &Conversation) -> String {
        conversation
            .messages
            .iter()
            .filter(|m| !m.is_blank())
            .map(|m| self.section(m))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render one message as banner, body and rule.
    pub fn section(&self, message: &Message) -> String {
        let body = match message.role {
            Role::System => self.render_system(&message.content),
            Role::User => self.clean(&message.content),
            Role::Assistant => wrap(ASSISTANT_ENVELOPE, &self.clean(&message.content)),
        };
        format!("{}\n{}\n{}\n", banner(message.role), body, SECTION_RULE)
    }

    fn render_system(&self, content: &str) -> String {
        let blocks = tags::parse(content);
        if blocks.is_empty() {
            return self.clean(content);
        }
        blocks
            .iter()
            .map(|block| wrap(&block.label, &self.clean(block.content.trim())))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn clean(&self, text: &str) -> String {
        let text = unescape_newlines(text);
        self.anonymizer.apply(&text).into_owned()
    }
}

fn wrap(label: &str, body: &str) -> String {
    format!("<{label}>\n{body}\n</{label}>")
}

/// One-shot helper around [`TranscriptFormatter`].
pub fn format_transcript(conversation: &Conversation, user_entity: Option<&str>) -> String {
    TranscriptFormatter::new(user_entity).format(conversation)
}
