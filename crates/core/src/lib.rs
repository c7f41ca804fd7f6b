//! # rolelog core
//!
//! Domain types and the pure transcript pipeline for rolelog.
//!
//! A roleplay chat request flows through four pure stages here, and a fifth
//! (persistence) in `rolelog-logbook`:
//!
//! 1. [`extract`]: character candidates from system messages
//! 2. [`resolve`]: which character the user plays, which the assistant plays
//! 3. [`anonymize`]: the user's character name becomes `{{user}}`
//! 4. [`transcript`]: role-segmented, tag-preserving text rendering
//!
//! The [`storage::LogStorage`] trait the fifth stage writes through is
//! defined here too.
//!
//! None of the stages can fail; missing information degrades to defaults
//! (`"unknown"` assistant, no user).

pub mod anonymize;
pub mod error;
pub mod extract;
pub mod message;
pub mod normalize;
pub mod pipeline;
pub mod resolve;
pub mod storage;
pub mod tags;
pub mod transcript;

// Re-export key types at crate root for ergonomics
pub use anonymize::{Anonymizer, USER_PLACEHOLDER, anonymize};
pub use error::{Error, Result, StorageError};
pub use extract::{EntityCandidate, SignalStrength, SourceSpan, Strategy, extract_candidates};
pub use message::{Conversation, Message, Role};
pub use normalize::NormalizedKey;
pub use pipeline::{Pipeline, ProcessedConversation};
pub use resolve::{ResolutionRule, ResolvedCharacters, Resolver, UNKNOWN_ENTITY};
pub use storage::LogStorage;
pub use tags::{BlockKind, TagBlock};
pub use transcript::{TranscriptFormatter, format_transcript};
