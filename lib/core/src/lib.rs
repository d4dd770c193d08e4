//! Core domain types and utilities for taskmate.
//!
//! This crate provides the foundational types, error handling, and shared
//! utilities used by the conversational task manager.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ConnectionId, ConversationSessionId, ParseIdError};
