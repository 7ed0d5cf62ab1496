//! Chat HTTP adapter - the turn request/response wire contract.

mod dto;
mod handlers;
mod routes;

pub use dto::{ChatRequest, ChatResponse, ErrorResponse};
pub use handlers::{post_chat, ChatAppState};
pub use routes::{chat_router, chat_routes};
