//! # Gateway Config
//!
//! Configuration for the LLM inference router.
//!
//! The configuration is a single YAML document with camelCase keys. It lists
//! the backend models to register, the default provider/model used when a
//! request omits them, and the server settings (listener, TLS, authorization).
//!
//! ```yaml
//! defaultProvider: openai
//! defaultModelId: gpt-3.5-turbo
//! models:
//!   - provider: openai
//!     modelId: gpt-3.5-turbo
//!     url: https://api.openai.com
//!     apiKey: env:OPENAI_API_KEY
//! serverConfig:
//!   tokenEncryptionKey: c2VjcmV0
//!   allowedUsers:
//!     alice: true
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod loader;
pub mod schema;

pub use loader::{load_config, ConfigLoader};
pub use schema::{GatewayConfig, ModelConfig, ServerConfig};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// The YAML could not be parsed into the schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A secret referenced an unset environment variable
    #[error("environment variable {0} referenced by config is not set")]
    MissingEnv(String),

    /// The configuration parsed but is not usable
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
