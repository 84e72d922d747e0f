//! Prometheus metrics.

use crate::TelemetryError;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metrics configuration
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Metric name prefix
    pub namespace: String,
    /// Latency histogram buckets, in seconds
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: "llm_router".to_string(),
            latency_buckets: vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
        }
    }
}

/// Router metrics, backed by a private registry
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    inference_total: IntCounterVec,
    inference_duration: HistogramVec,
    auth_failures_total: IntCounterVec,
    tokens_issued_total: IntCounterVec,
}

impl Metrics {
    /// Register all metrics
    ///
    /// # Errors
    /// Returns error if a metric cannot be registered
    pub fn new(config: &MetricsConfig) -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let inference_total = IntCounterVec::new(
            Opts::new("inference_total", "Inference requests by provider key and outcome")
                .namespace(config.namespace.clone()),
            &["provider", "outcome"],
        )?;
        let inference_duration = HistogramVec::new(
            HistogramOpts::new("inference_duration_seconds", "End-to-end invocation latency")
                .namespace(config.namespace.clone())
                .buckets(config.latency_buckets.clone()),
            &["provider"],
        )?;
        let auth_failures_total = IntCounterVec::new(
            Opts::new("auth_failures_total", "Rejected requests by reason")
                .namespace(config.namespace.clone()),
            &["reason"],
        )?;
        let tokens_issued_total = IntCounterVec::new(
            Opts::new("tokens_issued_total", "Bearer tokens issued through the login flow")
                .namespace(config.namespace.clone()),
            &["provider"],
        )?;

        registry.register(Box::new(inference_total.clone()))?;
        registry.register(Box::new(inference_duration.clone()))?;
        registry.register(Box::new(auth_failures_total.clone()))?;
        registry.register(Box::new(tokens_issued_total.clone()))?;

        Ok(Self {
            registry,
            inference_total,
            inference_duration,
            auth_failures_total,
            tokens_issued_total,
        })
    }

    /// Record one invocation. `outcome` is `success` or an error type.
    pub fn record_inference(&self, provider: &str, outcome: &str, elapsed: Duration) {
        self.inference_total
            .with_label_values(&[provider, outcome])
            .inc();
        self.inference_duration
            .with_label_values(&[provider])
            .observe(elapsed.as_secs_f64());
    }

    /// Record a rejected request
    pub fn record_auth_failure(&self, reason: &str) {
        self.auth_failures_total.with_label_values(&[reason]).inc();
    }

    /// Record a token issued to a user authenticated with `identity_provider`
    pub fn record_token_issued(&self, identity_provider: &str) {
        self.tokens_issued_total
            .with_label_values(&[identity_provider])
            .inc();
    }

    /// Encode all metrics in the Prometheus text format
    pub fn gather(&self) -> String {
        let mut buffer = Vec::new();
        if TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .is_err()
        {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}
