//! Foundation - Shared value objects for the domain layer.
//!
//! Strongly-typed identifiers, timestamps, and the common error types
//! every other domain module builds on.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{GuideId, SessionId, UserId};
pub use timestamp::Timestamp;
