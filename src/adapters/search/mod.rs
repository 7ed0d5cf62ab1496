//! Search adapters - Web search fallback implementations.

mod grounded_search;
mod mock_search;

pub use grounded_search::{GroundedSearchConfig, GroundedSearchConnector};
pub use mock_search::MockSearchConnector;
