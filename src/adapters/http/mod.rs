//! HTTP adapters - Inbound wire contracts.

pub mod chat;
