//! Conversation domain - Messages and session state.

mod message;
mod session;

pub use message::{Message, MessageId, Role};
pub use session::SessionContext;
