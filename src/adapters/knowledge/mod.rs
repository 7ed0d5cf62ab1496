//! Knowledge adapters - Verified manual source implementations.

mod ifixit;
mod mock_connector;

pub use ifixit::{IFixitConfig, IFixitConnector};
pub use mock_connector::MockKnowledgeConnector;
