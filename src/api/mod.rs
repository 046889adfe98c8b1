pub mod chat;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// All HTTP routes over the shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat::chat))
        .route("/api/clear", post(chat::clear))
        .route("/api/conversation", get(chat::conversation))
        .route("/api/health", get(chat::health))
        .route("/api/catalog/reload", post(chat::reload_catalog))
        .with_state(state)
}
