//! Language model access for taskmate.
//!
//! This crate provides:
//!
//! - **Backend seam**: the `LlmBackend` trait and the provider-neutral
//!   request, message and response types the agent loop speaks
//! - **Gemini**: a `generateContent` backend with function calling

pub mod backend;
pub mod error;
pub mod gemini;

pub use backend::{
    LlmBackend, LlmMessage, LlmProvider, LlmRequest, LlmResponse, TokenUsage, ToolCall, ToolSchema,
};
pub use error::LlmError;
pub use gemini::{GeminiBackend, GeminiConfig};
