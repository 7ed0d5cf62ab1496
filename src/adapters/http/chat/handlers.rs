//! Axum handlers for the chat endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::application::agent::{AgentOrchestrator, TurnError, TurnRequest};
use crate::domain::foundation::{SessionId, UserId};

use super::dto::{ChatRequest, ChatResponse, ErrorResponse};

/// Shared state for chat handlers.
#[derive(Clone)]
pub struct ChatAppState {
    /// The agent orchestrator driving every turn.
    pub orchestrator: Arc<AgentOrchestrator>,
}

impl ChatAppState {
    /// Creates the handler state.
    pub fn new(orchestrator: Arc<AgentOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// POST /api/chat - process one turn synchronously.
pub async fn post_chat(
    State(state): State<ChatAppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    let session_id: SessionId = request
        .session_id
        .parse()
        .map_err(|_| bad_request("sessionId must be a UUID"))?;
    let user_id =
        UserId::new(&request.user_id).map_err(|_| bad_request("userId must not be empty"))?;

    let turn = TurnRequest::new(session_id, user_id, request.message);
    match state.orchestrator.process_turn(turn).await {
        Ok(response) => Ok(Json(ChatResponse::from(response))),
        Err(TurnError::EmptyMessage) => Err(bad_request("message must not be empty")),
        Err(TurnError::Context(message)) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: message }),
        )),
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}
