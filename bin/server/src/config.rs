//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys
//! use `__` as separator, e.g. `GEMINI__API_KEY` or `AGENT__MAX_TOOL_ROUNDS`.
//!
//! See [`GeminiConfig`] for the model backend and [`AgentConfig`] for the
//! conversation loop.

use serde::Deserialize;
use taskmate_ai::GeminiConfig;
use taskmate_conversation::AgentConfig;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Socket address to listen on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Frontend origin allowed by CORS.
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Connection pool settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Gemini backend configuration.
    pub gemini: GeminiConfig,

    /// Conversation loop configuration.
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Connection pool configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
