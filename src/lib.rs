//! chatbridge: chat with local and hosted LLM backends through one interface
//!
//! This library provides the bot adapters, their settings storage, and the
//! registry that tracks which bots are active for a session.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::too_many_lines)]

pub mod cli;
pub mod config;
pub mod error;
pub mod messages;
pub mod registry;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use error::{ChatBridgeError, ChatError, ErrorCode, Result};
