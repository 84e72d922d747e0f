//! # Gateway Telemetry
//!
//! Observability for the LLM inference router:
//! - Structured logging through `tracing-subscriber`
//! - Prometheus metrics for inference and authorization outcomes

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;

// Re-export main types
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{Metrics, MetricsConfig};

/// Telemetry errors
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed
    #[error("failed to initialize logging: {0}")]
    Logging(String),

    /// Metric registration or encoding failed
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
