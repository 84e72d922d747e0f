//! Error types for the router.
//!
//! Every fallible step below the HTTP layer returns a [`GatewayError`]. Only
//! the server maps errors onto status codes, through [`GatewayError::status_code`].

use http::StatusCode;
use std::time::Duration;

/// Result alias used across the workspace
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Router error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Missing or invalid configuration, such as an absent credential
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// No adapter is registered under the requested provider/model key
    #[error("invalid provider/model '{key}', valid keys are: [{}]", .available.join(", "))]
    ModelNotFound {
        /// Requested composite key
        key: String,
        /// Registered keys, sorted
        available: Vec<String>,
    },

    /// Network-level failure talking to the upstream
    #[error("{provider} request failed: {message}")]
    Transport {
        /// Provider type
        provider: String,
        /// Error message
        message: String,
    },

    /// Upstream answered with a non-success status
    #[error("{provider} API request failed with status: {status}")]
    Upstream {
        /// Provider type
        provider: String,
        /// HTTP status returned by the upstream
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// Upstream call exceeded its deadline
    #[error("{provider} request timed out after {}s", .timeout.as_secs())]
    Timeout {
        /// Provider type
        provider: String,
        /// Configured deadline
        timeout: Duration,
    },

    /// Upstream body could not be decoded into the expected shape
    #[error("failed to decode {provider} response: {message}")]
    Decode {
        /// Provider type
        provider: String,
        /// Error message
        message: String,
    },

    /// A filter stage rejected the content
    #[error("{message}")]
    FilterRejection {
        /// Name of the rejecting stage
        stage: String,
        /// Error message
        message: String,
    },

    /// Malformed inbound input
    #[error("Validation error: {message}")]
    Validation {
        /// Error message
        message: String,
    },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

impl GatewayError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a model-not-found error listing the registered keys
    pub fn model_not_found(key: impl Into<String>, mut available: Vec<String>) -> Self {
        available.sort();
        Self::ModelNotFound {
            key: key.into(),
            available,
        }
    }

    /// Create a transport error
    pub fn transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an upstream status error
    pub fn upstream(provider: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Upstream {
            provider: provider.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a decode error
    pub fn decode(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a filter rejection
    pub fn filter_rejection(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FilterRejection {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status code the server replies with for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ModelNotFound { .. } | Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Configuration { .. } | Self::FilterRejection { .. } => {
                StatusCode::EXPECTATION_FAILED
            }
            Self::Transport { .. } | Self::Upstream { .. } | Self::Decode { .. } => {
                StatusCode::BAD_GATEWAY
            }
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable error code, used for metrics labels
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration_error",
            Self::ModelNotFound { .. } => "model_not_found",
            Self::Transport { .. } => "transport_error",
            Self::Upstream { .. } => "upstream_error",
            Self::Timeout { .. } => "timeout",
            Self::Decode { .. } => "decode_error",
            Self::FilterRejection { .. } => "filter_rejection",
            Self::Validation { .. } => "validation_error",
            Self::Internal { .. } => "internal_error",
        }
    }
}
