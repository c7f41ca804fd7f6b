//! Log routing: the last pipeline stage.
//!
//! Given the resolved assistant entity, the formatted transcript and the raw
//! `messages` array, the router:
//!
//! 1. derives the identifier key and its [`LogTarget`],
//! 2. marks the key in the [`SeenSet`] (remembering whether it was new),
//! 3. checks whether the transcript log already exists,
//! 4. appends the entry, prefixed with a header block when the key is new to
//!    this process or the file is missing,
//! 5. overwrites the raw copy with the pretty-printed messages.
//!
//! Steps 2-5 run under a per-identifier lock. Any storage failure is
//! redirected to [`FALLBACK_LOG`] and never reaches the caller.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use rolelog_core::error::StorageError;
use rolelog_core::storage::LogStorage;
use serde_json::Value;
use tracing::{error, info};

use crate::seen::{KeyedLocks, SeenSet};
use crate::target::{FALLBACK_LOG, LogTarget};

/// What happened to one routed transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOutcome {
    pub target: LogTarget,
    /// A header block preceded the entry.
    pub header_written: bool,
    /// Set when the regular write failed and the fallback log was used.
    pub fallback_reason: Option<String>,
}

impl RouteOutcome {
    pub fn used_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// Header that opens a character's log file.
pub fn format_header(ai_entity: &str, timestamp: &str) -> String {
    format!("LOG FILE FOR CHARACTER: {ai_entity}\nCreated: {timestamp}\n")
}

/// One request entry in a character's log file.
pub fn format_entry(transcript: &str, timestamp: &str) -> String {
    format!("\n==== Request at {timestamp} ====\n\n{transcript}\n")
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Routes formatted transcripts to per-character log files.
pub struct LogRouter {
    storage: Arc<dyn LogStorage>,
    seen: Arc<SeenSet>,
    locks: KeyedLocks,
}

impl LogRouter {
    /// Create a router over `storage`, sharing `seen` for the process lifetime.
    pub fn new(storage: Arc<dyn LogStorage>, seen: Arc<SeenSet>) -> Self {
        Self {
            storage,
            seen,
            locks: KeyedLocks::new(),
        }
    }

    pub fn storage(&self) -> &Arc<dyn LogStorage> {
        &self.storage
    }

    pub fn seen(&self) -> &Arc<SeenSet> {
        &self.seen
    }

    /// Persist one transcript and its raw messages.
    pub async fn route(&self, ai_entity: &str, transcript: &str, raw_messages: &Value) -> RouteOutcome {
        let target = LogTarget::for_entity(ai_entity);

        let result = {
            let _guard = self.locks.lock(&target.identifier_key).await;
            let first_sighting = self.seen.mark(&target.identifier_key);
            self.write(&target, ai_entity, transcript, raw_messages, first_sighting)
                .await
        };

        match result {
            Ok(header_written) => {
                info!(
                    identifier = %target.identifier_key,
                    header = header_written,
                    storage = self.storage.name(),
                    "Transcript logged"
                );
                RouteOutcome {
                    target,
                    header_written,
                    fallback_reason: None,
                }
            }
            Err(e) => {
                error!(identifier = %target.identifier_key, error = %e, "Log write failed, using fallback");
                self.write_fallback(&target, transcript, &e).await;
                RouteOutcome {
                    target,
                    header_written: false,
                    fallback_reason: Some(e.to_string()),
                }
            }
        }
    }

    async fn write(
        &self,
        target: &LogTarget,
        ai_entity: &str,
        transcript: &str,
        raw_messages: &Value,
        first_sighting: bool,
    ) -> Result<bool, StorageError> {
        let exists = self.storage.exists(&target.path).await?;
        let timestamp = now_iso();
        let header_needed = first_sighting || !exists;

        let mut text = String::new();
        if header_needed {
            text.push_str(&format_header(ai_entity, &timestamp));
        }
        text.push_str(&format_entry(transcript, &timestamp));
        self.storage.append(&target.path, &text).await?;

        let raw = serde_json::to_string_pretty(raw_messages).map_err(|e| {
            StorageError::WriteFailed {
                file: target.raw_path.clone(),
                reason: e.to_string(),
            }
        })?;
        self.storage.overwrite(&target.raw_path, &raw).await?;

        Ok(header_needed)
    }

    async fn write_fallback(&self, target: &LogTarget, transcript: &str, cause: &StorageError) {
        let entry = format!(
            "\n==== Error at {} ====\nidentifier: {}\nerror: {}\n\n{}\n",
            now_iso(),
            target.identifier_key,
            cause,
            transcript
        );

        let _guard = self.locks.lock(FALLBACK_LOG).await;
        if let Err(e) = self.storage.append(FALLBACK_LOG, &entry).await {
            error!(
                identifier = %target.identifier_key,
                error = %e,
                "Fallback log write failed, transcript dropped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryStorage;
    use serde_json::json;

    fn router_with(storage: &InMemoryStorage) -> LogRouter {
        LogRouter::new(Arc::new(storage.clone()), Arc::new(SeenSet::new()))
    }

    #[tokio::test]
    async fn first_write_has_header_and_raw_copy() {
        let storage = InMemoryStorage::new();
        let router = router_with(&storage);
        let raw = json!([{ "role": "user", "content": "Sam: hi" }]);

        let outcome = router.route("Nova", "TRANSCRIPT", &raw).await;
        assert!(outcome.header_written);
        assert!(!outcome.used_fallback());
        assert_eq!(outcome.target.identifier_key, "nova");

        let log = storage.read("request_nova.log").await.unwrap();
        assert!(log.starts_with("LOG FILE FOR CHARACTER: Nova\nCreated: "));
        assert!(log.contains("==== Request at "));
        assert!(log.contains("TRANSCRIPT"));

        let stored: Value = serde_json::from_str(&storage.read("request_nova_raw.json").await.unwrap()).unwrap();
        assert_eq!(stored, raw);
    }

    #[tokio::test]
    async fn second_write_appends_without_header() {
        let storage = InMemoryStorage::new();
        let router = router_with(&storage);

        router.route("Nova", "one", &json!([])).await;
        let outcome = router.route("Nova", "two", &json!([])).await;
        assert!(!outcome.header_written);

        let log = storage.read("request_nova.log").await.unwrap();
        assert_eq!(log.matches("LOG FILE FOR CHARACTER").count(), 1);
        assert_eq!(log.matches("==== Request at ").count(), 2);
        assert!(log.find("one").unwrap() < log.find("two").unwrap());
    }

    #[tokio::test]
    async fn raw_copy_is_overwritten() {
        let storage = InMemoryStorage::new();
        let router = router_with(&storage);

        router.route("Nova", "one", &json!([{ "n": 1 }])).await;
        router.route("Nova", "two", &json!([{ "n": 2 }])).await;

        let raw = storage.read("request_nova_raw.json").await.unwrap();
        assert!(raw.contains("2"));
        assert!(!raw.contains("1"));
    }

    #[tokio::test]
    async fn restart_re_emits_header_for_existing_file() {
        let storage = InMemoryStorage::new();
        storage.insert("request_nova.log", "old contents\n").await;

        let router = router_with(&storage);
        let outcome = router.route("Nova", "fresh", &json!([])).await;
        assert!(outcome.header_written);

        let log = storage.read("request_nova.log").await.unwrap();
        assert!(log.starts_with("old contents\nLOG FILE FOR CHARACTER: Nova"));
    }

    #[tokio::test]
    async fn deleted_file_gets_header_again() {
        let storage = InMemoryStorage::new();
        let seen = Arc::new(SeenSet::new());
        seen.mark("nova");
        let router = LogRouter::new(Arc::new(storage.clone()), seen);

        let outcome = router.route("Nova", "entry", &json!([])).await;
        assert!(outcome.header_written);
    }

    #[tokio::test]
    async fn equivalent_names_share_a_target() {
        let storage = InMemoryStorage::new();
        let router = router_with(&storage);

        router.route("Mx. Foo!", "a", &json!([])).await;
        let outcome = router.route("mx foo", "b", &json!([])).await;
        assert_eq!(outcome.target.path, "request_mx_foo.log");
        assert!(!outcome.header_written);
    }

    #[tokio::test]
    async fn failed_write_goes_to_fallback() {
        let storage = InMemoryStorage::new();
        storage.fail_on("request_nova.log").await;
        let router = router_with(&storage);

        let outcome = router.route("Nova", "TRANSCRIPT", &json!([])).await;
        assert!(outcome.used_fallback());
        assert!(!outcome.header_written);

        let fallback = storage.read(FALLBACK_LOG).await.unwrap();
        assert!(fallback.contains("identifier: nova"));
        assert!(fallback.contains("simulated failure"));
        assert!(fallback.contains("TRANSCRIPT"));
        assert!(storage.read("request_nova_raw.json").await.is_none());
    }

    #[tokio::test]
    async fn failed_raw_copy_goes_to_fallback() {
        let storage = InMemoryStorage::new();
        storage.fail_on("request_nova_raw.json").await;
        let router = router_with(&storage);

        let outcome = router.route("Nova", "TRANSCRIPT", &json!([])).await;
        assert!(outcome.used_fallback());
        assert!(storage.read("request_nova.log").await.is_some());
        assert!(storage.read(FALLBACK_LOG).await.is_some());
    }

    #[tokio::test]
    async fn failed_fallback_is_swallowed() {
        let storage = InMemoryStorage::new();
        storage.fail_on("request_nova.log").await;
        storage.fail_on(FALLBACK_LOG).await;
        let router = router_with(&storage);

        let outcome = router.route("Nova", "TRANSCRIPT", &json!([])).await;
        assert!(outcome.used_fallback());
        assert!(storage.file_names().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_first_writes_emit_one_header() {
        let storage = InMemoryStorage::new();
        let router = Arc::new(router_with(&storage));

        let mut handles = Vec::new();
        for i in 0..16 {
            let router = router.clone();
            handles.push(tokio::spawn(async move {
                router.route("Nova", &format!("entry {i}"), &json!([i])).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let log = storage.read("request_nova.log").await.unwrap();
        assert_eq!(log.matches("LOG FILE FOR CHARACTER").count(), 1);
        assert_eq!(log.matches("==== Request at ").count(), 16);
    }

    #[test]
    fn entry_and_header_layout() {
        assert_eq!(
            format_header("Nova", "2026-01-01T00:00:00.000Z"),
            "LOG FILE FOR CHARACTER: Nova\nCreated: 2026-01-01T00:00:00.000Z\n"
        );
        assert_eq!(
            format_entry("body", "2026-01-01T00:00:00.000Z"),
            "\n==== Request at 2026-01-01T00:00:00.000Z ====\n\nbody\n"
        );
    }
}
