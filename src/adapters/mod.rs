//! Adapters - Concrete implementations of the ports.
//!
//! Outbound: reasoning engine, knowledge and search connectors, session
//! store, usage tracker. Inbound: the chat HTTP endpoint. Mock adapters
//! live here too so tests and wiring share one registry of doubles.

pub mod ai;
pub mod http;
pub mod knowledge;
pub mod search;
pub mod session;
pub mod usage;
