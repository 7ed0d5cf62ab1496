//! Axum routes for the chat endpoint.

use axum::routing::post;
use axum::Router;

use super::handlers::{post_chat, ChatAppState};

/// Creates routes for the chat endpoint.
///
/// REST Endpoints:
/// - POST /api/chat - Process one turn synchronously
pub fn chat_routes() -> Router<ChatAppState> {
    Router::new().route("/chat", post(post_chat))
}

/// Combined router with all chat routes under /api.
pub fn chat_router() -> Router<ChatAppState> {
    Router::new().nest("/api", chat_routes())
}
