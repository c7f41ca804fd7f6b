//! Anonymization: replaces the human's character name with a placeholder.
//!
//! Three passes run in order, each over the previous pass's output:
//!
//! 1. `Name:` at the start of a line,
//! 2. `Name` as a whole word,
//! 3. `Name` as a raw substring (catches names whose symbols defeat word
//!    boundaries, at the cost of occasionally hitting unrelated words).
//!
//! Text already inside a placeholder is never rewritten, which keeps the
//! operation idempotent even for names like `user`.

use std::borrow::Cow;

use regex_lite::Regex;

/// Token that stands in for the human's character name.
pub const USER_PLACEHOLDER: &str = "{{user}}";

/// Replaces one entity name throughout a text.
#[derive(Debug, Clone)]
pub struct Anonymizer {
    entity: String,
    line_prefix: Option<Regex>,
    whole_word: Option<Regex>,
}

impl Anonymizer {
    /// Build an anonymizer for `entity`; `None` or a blank name yields a
    /// no-op anonymizer.
    pub fn new(entity: Option<&str>) -> Self {
        let entity = entity.map(str::trim).unwrap_or_default().to_string();
        if entity.is_empty() {
            return Self {
                entity,
                line_prefix: None,
                whole_word: None,
            };
        }

        let escaped = regex_lite::escape(&entity);
        Self {
            line_prefix: Regex::new(&format!("(?m)^{escaped}:")).ok(),
            whole_word: Regex::new(&format!(r"\b{escaped}\b")).ok(),
            entity,
        }
    }

    /// Whether this anonymizer can rewrite anything at all.
    pub fn is_active(&self) -> bool {
        !self.entity.is_empty()
    }

    /// Rewrite every mention of the entity in `content`.
    pub fn apply<'a>(&self, content: &'a str) -> Cow<'a, str> {
        if !self.is_active() || !content.contains(&self.entity) {
            return Cow::Borrowed(content);
        }

        let mut text = content.to_string();
        if let Some(re) = &self.line_prefix {
            let prefixed = format!("{USER_PLACEHOLDER}:");
            text = outside_placeholders(&text, |s| re.replace_all(s, prefixed.as_str()).into_owned());
        }
        if let Some(re) = &self.whole_word {
            text = outside_placeholders(&text, |s| re.replace_all(s, USER_PLACEHOLDER).into_owned());
        }
        text = outside_placeholders(&text, |s| s.replace(&self.entity, USER_PLACEHOLDER));
        Cow::Owned(text)
    }
}

/// Apply `rewrite` to the stretches of `text` between placeholders.
fn outside_placeholders(text: &str, rewrite: impl Fn(&str) -> String) -> String {
    text.split(USER_PLACEHOLDER)
        .map(rewrite)
        .collect::<Vec<_>>()
        .join(USER_PLACEHOLDER)
}

/// One-shot helper around [`Anonymizer`].
pub fn anonymize(content: &str, user_entity: Option<&str>) -> String {
    Anonymizer::new(user_entity).apply(content).into_owned()
}
