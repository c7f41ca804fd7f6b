//! The pure part of the pipeline: extract → resolve → anonymize → format.

use tracing::debug;

use crate::extract::{EntityCandidate, extract_candidates};
use crate::message::Conversation;
use crate::resolve::{ResolvedCharacters, Resolver};
use crate::transcript::TranscriptFormatter;

/// Everything the pure stages produce for one conversation.
#[derive(Debug, Clone)]
pub struct ProcessedConversation {
    pub candidates: Vec<EntityCandidate>,
    pub characters: ResolvedCharacters,
    pub transcript: String,
}

/// Runs stages 1-4 with a configurable resolver.
#[derive(Default)]
pub struct Pipeline {
    resolver: Resolver,
}

impl Pipeline {
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    pub fn process(&self, conversation: &Conversation) -> ProcessedConversation {
        let candidates = extract_candidates(conversation);
        let characters = self.resolver.resolve(&candidates, conversation);
        let transcript =
            TranscriptFormatter::new(characters.user_entity.as_deref()).format(conversation);

        debug!(
            messages = conversation.len(),
            candidates = candidates.len(),
            ai_entity = %characters.ai_entity,
            user_entity = ?characters.user_entity,
            "Conversation processed"
        );

        ProcessedConversation {
            candidates,
            characters,
            transcript,
        }
    }
}
