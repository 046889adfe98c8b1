use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::models::{ChatRequest, ChatResponse};
use crate::state::AppState;

const MAX_CHAT_MESSAGE_LEN: usize = 2000;

/// POST /api/chat - one conversational turn.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let Some(message) = req.message else {
        return Err((
            StatusCode::BAD_REQUEST,
            "Missing 'message' in request body".to_string(),
        ));
    };
    let message = message.trim();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message cannot be empty".to_string()));
    }
    let message = truncate_to_char_boundary(message, MAX_CHAT_MESSAGE_LEN);

    let catalog = state.catalog();
    let mut memory = state.memory.lock().await;
    let outcome = state.assistant.respond(&catalog, &mut memory, &message).await;

    Ok(Json(ChatResponse {
        response: outcome.response,
    }))
}

/// POST /api/clear
pub async fn clear(State(state): State<AppState>) -> Json<Value> {
    state.memory.lock().await.clear();
    Json(json!({
        "message": "Conversation cleared successfully",
        "conversation": [],
    }))
}

/// GET /api/conversation
pub async fn conversation(State(state): State<AppState>) -> Json<Value> {
    let memory = state.memory.lock().await;
    Json(json!({
        "conversation": memory.views(),
        "summary": memory.summary(),
    }))
}

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// POST /api/catalog/reload - rebuild the catalog from its source and swap it in.
pub async fn reload_catalog(State(state): State<AppState>) -> Result<Json<Value>, (StatusCode, String)> {
    let reload_state = state.clone();
    let records = tokio::task::spawn_blocking(move || reload_state.reload_catalog())
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Catalog reload error: {e}"),
            )
        })?
        .map_err(|e| {
            tracing::warn!("Catalog reload failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Catalog reload error: {e}"),
            )
        })?;

    tracing::info!("Catalog reloaded: {records} records");
    Ok(Json(json!({ "records": records })))
}

fn truncate_to_char_boundary(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    s.char_indices()
        .take_while(|(i, _)| *i < max_len)
        .map(|(_, c)| c)
        .collect()
}
