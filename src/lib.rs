//! FixMaster - Conversational Repair Assistant Backend
//!
//! This crate implements a tool-calling agent loop over verified repair
//! guide data, with open web search as a one-shot fallback and
//! summarization-based context bounding.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
