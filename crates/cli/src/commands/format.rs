//! `rolelog format`: run the transcript pipeline over a saved request.

use std::path::Path;
use std::sync::Arc;

use rolelog_config::AppConfig;
use rolelog_core::message::Conversation;
use rolelog_core::pipeline::Pipeline;
use rolelog_core::storage::LogStorage;
use rolelog_logbook::{FsStorage, LogRouter, SeenSet};
use serde_json::Value;
use tracing::{debug, warn};

/// Accept either a bare messages array or a request body carrying one.
fn messages_from(payload: Value) -> Result<Value, String> {
    match payload {
        Value::Array(_) => Ok(payload),
        Value::Object(mut map) => match map.remove("messages") {
            Some(messages @ Value::Array(_)) => Ok(messages),
            _ => Err("Messages array is required".into()),
        },
        _ => Err("Expected a messages array or an object with `messages`".into()),
    }
}

pub async fn run(file: &Path, log: bool) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let payload: Value = serde_json::from_str(&text)?;
    let raw_messages = messages_from(payload)?;
    let conversation = Conversation::from_json(&raw_messages)?;
    debug!(
        file = %file.display(),
        messages = conversation.messages.len(),
        "Loaded saved request"
    );

    let processed = Pipeline::default().process(&conversation);
    let characters = &processed.characters;

    println!("Assistant: {}", characters.ai_entity);
    println!(
        "User:      {}",
        characters.user_entity.as_deref().unwrap_or("(none)")
    );
    for candidate in &processed.candidates {
        println!(
            "  candidate {:?} ({:?}, {:?})",
            candidate.raw_name, candidate.strategy, candidate.strength
        );
    }
    println!();
    println!("{}", processed.transcript);

    if log {
        let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
        let storage: Arc<dyn LogStorage> = Arc::new(FsStorage::open(config.logs.dir.clone()).await?);

        let router = LogRouter::new(storage, Arc::new(SeenSet::new()));
        let outcome = router
            .route(&characters.ai_entity, &processed.transcript, &raw_messages)
            .await;

        match outcome.fallback_reason {
            Some(reason) => {
                warn!(identifier = %outcome.target.identifier_key, "Saved request went to the error log");
                println!("Log write failed ({reason}); entry sent to the error log")
            }
            None => println!(
                "Logged to {}",
                config.logs.dir.join(&outcome.target.path).display()
            ),
        }
    }

    Ok(())
}
