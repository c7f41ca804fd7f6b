//! OpenAI-compatible `/v1` handlers.
//!
//! Nothing here talks to a model. Every chat request is pushed through the
//! transcript pipeline and the log router, then answered with the configured
//! placeholder reply.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use rolelog_core::error::{Error, Result};
use rolelog_core::message::Conversation;
use rolelog_core::pipeline::ProcessedConversation;

use crate::{SharedState, error_response, server_error_response};

const MOCK_ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const MOCK_ID_LEN: usize = 9;

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelCard>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelCard {
    pub id: String,
    pub object: String,
    /// Milliseconds since the epoch.
    pub created: i64,
    pub owned_by: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    /// Seconds since the epoch.
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChoiceMessage,
    pub finish_reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChoiceMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// `"mock-"` followed by nine random lowercase alphanumerics.
pub fn mock_completion_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..MOCK_ID_LEN)
        .map(|_| MOCK_ID_CHARSET[rng.random_range(0..MOCK_ID_CHARSET.len())] as char)
        .collect();
    format!("mock-{suffix}")
}

pub async fn list_models(State(state): State<SharedState>) -> Json<ModelList> {
    let mock = &state.config.mock;
    Json(ModelList {
        object: "list".into(),
        data: vec![ModelCard {
            id: mock.model.clone(),
            object: "model".into(),
            created: chrono::Utc::now().timestamp_millis(),
            owned_by: mock.owned_by.clone(),
        }],
    })
}

/// Pull the `messages` array out of a request body, if there is one.
fn messages_of(body: &[u8]) -> Option<Value> {
    let mut payload: Value = serde_json::from_slice(body).ok()?;
    match payload.get_mut("messages")?.take() {
        messages @ Value::Array(_) => Some(messages),
        _ => None,
    }
}

/// Run the CPU-bound pipeline on the blocking pool.
async fn process_off_runtime(
    state: &SharedState,
    conversation: Conversation,
) -> Result<ProcessedConversation> {
    let state = state.clone();
    tokio::task::spawn_blocking(move || state.pipeline.process(&conversation))
        .await
        .map_err(|e| Error::Internal(format!("transcript pipeline failed: {e}")))
}

pub async fn chat_completions(State(state): State<SharedState>, body: Bytes) -> Response {
    let Some(raw_messages) = messages_of(&body) else {
        warn!(bytes = body.len(), "Rejected chat request without a messages array");
        return error_response(StatusCode::BAD_REQUEST, "Messages array is required");
    };

    debug!(body = %String::from_utf8_lossy(&body), "Chat completion request");

    let conversation = match Conversation::from_json(&raw_messages) {
        Ok(conversation) => conversation,
        Err(e) => {
            warn!(error = %e, "Rejected chat request");
            return error_response(StatusCode::BAD_REQUEST, "Messages array is required");
        }
    };

    let processed = match process_off_runtime(&state, conversation).await {
        Ok(processed) => processed,
        Err(e) => {
            error!(error = %e, "Chat request aborted");
            return server_error_response();
        }
    };

    state
        .router
        .route(
            &processed.characters.ai_entity,
            &processed.transcript,
            &raw_messages,
        )
        .await;

    let mock = &state.config.mock;
    Json(ChatCompletion {
        id: mock_completion_id(),
        object: "chat.completion".into(),
        created: chrono::Utc::now().timestamp(),
        model: mock.model.clone(),
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: "assistant".into(),
                content: mock.reply.clone(),
            },
            finish_reason: "stop".into(),
        }],
        usage: Usage::default(),
    })
    .into_response()
}
