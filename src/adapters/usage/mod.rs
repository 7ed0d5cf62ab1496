//! Usage adapters - Usage tracker implementations.

mod in_memory_tracker;

pub use in_memory_tracker::InMemoryUsageTracker;
