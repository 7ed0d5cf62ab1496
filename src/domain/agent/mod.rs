//! Agent domain - Turn outcomes, tool value objects, and safety
//! classification for the repair agent loop.

pub mod tools;

mod safety;
mod turn;

pub use safety::{SafetyClassifier, SafetyLevel, SafetyReport};
pub use turn::{AgentResponse, SourceTag, TurnOutcome};
