//! Tag extraction: the first pipeline stage.
//!
//! Scans system-role messages for character declarations and yields raw
//! [`EntityCandidate`]s in document order. Three strategies are tried per
//! message and the first one that produces anything wins for that message:
//!
//! 1. bracketed blocks whose content looks like a character sheet,
//! 2. inline `Name("Nova")` declarations,
//! 3. `Name: Nova` labels (fallback).
//!
//! `<system>` wrappers are masked before any strategy runs.

use std::ops::Range;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::message::{Conversation, Role};
use crate::tags::{self, BlockKind};

static QUOTED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bname\("([^"\r\n]*)"\)"#).expect("quoted-name pattern is valid")
});

static NAME_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bname:[ \t]*([^,\r\n]+)").expect("name-label pattern is valid")
});

/// Which extraction strategy produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    BracketedTag,
    QuotedName,
    Label,
}

/// Qualitative confidence that a candidate names a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SignalStrength {
    Weak,
    Moderate,
    Strong,
}

/// Where in the conversation a candidate was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    /// Index of the message within the conversation.
    pub message_index: usize,
    /// Byte range within that message's content.
    pub range: Range<usize>,
}

/// A possible character name pulled out of system content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityCandidate {
    pub raw_name: String,
    pub span: SourceSpan,
    pub strength: SignalStrength,
    pub strategy: Strategy,
}

/// Extract candidates from every system message of `conversation`.
pub fn extract_candidates(conversation: &Conversation) -> Vec<EntityCandidate> {
    conversation
        .messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.role == Role::System)
        .flat_map(|(index, m)| extract_from_content(index, &m.content))
        .collect()
}

/// Extract candidates from a single system message's content.
pub fn extract_from_content(message_index: usize, content: &str) -> Vec<EntityCandidate> {
    let masked = tags::mask_blocks(content, "system");

    let found = bracketed(message_index, &masked);
    if !found.is_empty() {
        return found;
    }
    let found = quoted(message_index, &masked);
    if !found.is_empty() {
        return found;
    }
    labelled(message_index, &masked)
}

fn bracketed(message_index: usize, text: &str) -> Vec<EntityCandidate> {
    tags::parse(text)
        .into_iter()
        .filter_map(|block| {
            let strength = match block.classify() {
                BlockKind::DescribedEntity => SignalStrength::Strong,
                BlockKind::LongEntity => SignalStrength::Moderate,
                BlockKind::Structural | BlockKind::Minor => return None,
            };
            Some(EntityCandidate {
                raw_name: block.label,
                span: SourceSpan {
                    message_index,
                    range: block.span,
                },
                strength,
                strategy: Strategy::BracketedTag,
            })
        })
        .collect()
}

fn quoted(message_index: usize, text: &str) -> Vec<EntityCandidate> {
    captures(&QUOTED_NAME, message_index, text, SignalStrength::Strong, Strategy::QuotedName)
}

fn labelled(message_index: usize, text: &str) -> Vec<EntityCandidate> {
    captures(&NAME_LABEL, message_index, text, SignalStrength::Weak, Strategy::Label)
}

fn captures(
    pattern: &Regex,
    message_index: usize,
    text: &str,
    strength: SignalStrength,
    strategy: Strategy,
) -> Vec<EntityCandidate> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?.as_str().trim();
            if name.is_empty() {
                return None;
            }
            Some(EntityCandidate {
                raw_name: name.to_string(),
                span: SourceSpan {
                    message_index,
                    range: whole.range(),
                },
                strength,
                strategy,
            })
        })
        .collect()
}
