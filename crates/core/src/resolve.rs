//! Character set resolution: the second pipeline stage.
//!
//! Decides which entity the human plays (from `Name:` prefixes on user
//! messages) and which the assistant plays (from the extracted candidates).
//! The assistant side is an ordered list of [`ResolutionRule`]s; the first
//! rule that produces a name wins.

use serde::Serialize;
use tracing::debug;

use crate::extract::EntityCandidate;
use crate::message::{Conversation, Role};
use crate::normalize::NormalizedKey;
use crate::tags::is_structural_label;

/// Assistant entity used when nothing could be resolved.
pub const UNKNOWN_ENTITY: &str = "unknown";

/// The outcome of resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCharacters {
    /// The entity the human is portraying, when a speaker prefix was found.
    pub user_entity: Option<String>,
    /// The entity the assistant is portraying; `"unknown"` as a last resort.
    pub ai_entity: String,
}

impl Default for ResolvedCharacters {
    fn default() -> Self {
        Self {
            user_entity: None,
            ai_entity: UNKNOWN_ENTITY.to_string(),
        }
    }
}

/// Inputs visible to every resolution rule.
#[derive(Debug)]
pub struct ResolutionContext<'a> {
    /// Deduplicated, non-structural candidates in document order.
    pub candidates: &'a [EntityCandidate],
    /// The raw user-entity guess, if any.
    pub user_guess: Option<&'a str>,
}

/// One step of the assistant-entity precedence list.
pub trait ResolutionRule: Send + Sync {
    /// Rule name (for logging).
    fn name(&self) -> &'static str;

    /// Return the assistant entity, or `None` to defer to the next rule.
    fn attempt(&self, ctx: &ResolutionContext<'_>) -> Option<String>;
}

/// Nothing extracted: the assistant is `"unknown"`.
pub struct NoCandidates;

impl ResolutionRule for NoCandidates {
    fn name(&self) -> &'static str {
        "no_candidates"
    }

    fn attempt(&self, ctx: &ResolutionContext<'_>) -> Option<String> {
        ctx.candidates
            .is_empty()
            .then(|| UNKNOWN_ENTITY.to_string())
    }
}

/// Exactly one candidate wins regardless of the user guess.
pub struct SingleCandidate;

impl ResolutionRule for SingleCandidate {
    fn name(&self) -> &'static str {
        "single_candidate"
    }

    fn attempt(&self, ctx: &ResolutionContext<'_>) -> Option<String> {
        match ctx.candidates {
            [only] => Some(only.raw_name.clone()),
            _ => None,
        }
    }
}

/// First candidate whose key does not overlap the user guess.
pub struct DistinctFromUser;

impl ResolutionRule for DistinctFromUser {
    fn name(&self) -> &'static str {
        "distinct_from_user"
    }

    fn attempt(&self, ctx: &ResolutionContext<'_>) -> Option<String> {
        let user_key = NormalizedKey::new(ctx.user_guess?);
        ctx.candidates
            .iter()
            .find(|c| !NormalizedKey::new(&c.raw_name).overlaps(&user_key))
            .map(|c| c.raw_name.clone())
    }
}

/// First candidate overall.
pub struct FirstCandidate;

impl ResolutionRule for FirstCandidate {
    fn name(&self) -> &'static str {
        "first_candidate"
    }

    fn attempt(&self, ctx: &ResolutionContext<'_>) -> Option<String> {
        ctx.candidates.first().map(|c| c.raw_name.clone())
    }
}

/// Runs user detection and the assistant rule list.
pub struct Resolver {
    rules: Vec<Box<dyn ResolutionRule>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(NoCandidates),
            Box::new(SingleCandidate),
            Box::new(DistinctFromUser),
            Box::new(FirstCandidate),
        ])
    }
}

impl Resolver {
    pub fn new(rules: Vec<Box<dyn ResolutionRule>>) -> Self {
        Self { rules }
    }

    /// Names of the configured rules, in precedence order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn resolve(
        &self,
        candidates: &[EntityCandidate],
        conversation: &Conversation,
    ) -> ResolvedCharacters {
        let survivors = surviving_candidates(candidates);
        let user_entity = detect_user_entity(conversation);
        let ctx = ResolutionContext {
            candidates: &survivors,
            user_guess: user_entity.as_deref(),
        };

        let mut ai_entity = None;
        for rule in &self.rules {
            if let Some(name) = rule.attempt(&ctx) {
                debug!(rule = rule.name(), ai_entity = %name, "Assistant entity resolved");
                ai_entity = Some(name);
                break;
            }
        }

        ResolvedCharacters {
            user_entity,
            ai_entity: ai_entity.unwrap_or_else(|| UNKNOWN_ENTITY.to_string()),
        }
    }
}

/// Drop structural labels and repeated names, keeping first occurrences.
pub fn surviving_candidates(candidates: &[EntityCandidate]) -> Vec<EntityCandidate> {
    let mut survivors: Vec<EntityCandidate> = Vec::new();
    for candidate in candidates {
        let name = candidate.raw_name.trim();
        if name.is_empty() || is_structural_label(name) {
            continue;
        }
        if survivors.iter().any(|s| s.raw_name == name) {
            continue;
        }
        let mut kept = candidate.clone();
        kept.raw_name = name.to_string();
        survivors.push(kept);
    }
    survivors
}

/// Find the speaker prefix of the most recent user message that has one.
///
/// A prefix is everything before the first colon on the message's first line.
pub fn detect_user_entity(conversation: &Conversation) -> Option<String> {
    conversation.by_role(Role::User).rev().find_map(|message| {
        let first_line = message.content.trim_start().lines().next()?;
        let (label, _) = first_line.split_once(':')?;
        let label = label.trim();
        (!label.is_empty()).then(|| label.to_string())
    })
}
