//! Log targets: where a character's transcripts are written.

use rolelog_core::UNKNOWN_ENTITY;

/// File that receives entries whose regular write failed.
pub const FALLBACK_LOG: &str = "error-log.log";

/// Derive the filesystem-safe identifier for an assistant entity.
///
/// Lowercases, drops everything that is not a letter, digit or whitespace,
/// and joins the remaining words with `_`. `"Mx. Foo!"` and `"mx foo"` both
/// become `mx_foo`; a name with nothing left becomes `unknown`.
pub fn identifier_key(ai_entity: &str) -> String {
    let kept: String = ai_entity
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let key = kept.split_whitespace().collect::<Vec<_>>().join("_");
    if key.is_empty() {
        UNKNOWN_ENTITY.to_string()
    } else {
        key
    }
}

/// The pair of files written for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    pub identifier_key: String,
    /// Append-only transcript log.
    pub path: String,
    /// Pretty-printed copy of the latest raw message list.
    pub raw_path: String,
}

impl LogTarget {
    pub fn for_entity(ai_entity: &str) -> Self {
        Self::for_key(identifier_key(ai_entity))
    }

    pub fn for_key(identifier_key: String) -> Self {
        Self {
            path: format!("request_{identifier_key}.log"),
            raw_path: format!("request_{identifier_key}_raw.json"),
            identifier_key,
        }
    }
}
