//! taskmate server: HTTP routes, the chat WebSocket and PostgreSQL storage.

pub mod app;
pub mod config;
pub mod connections;
pub mod db;
pub mod error;
pub mod messages;
pub mod ws;
