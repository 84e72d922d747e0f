//! HTTP plumbing shared by the adapters.

use gateway_core::{GatewayError, ProviderType};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Build a pooled client with a whole-request deadline
pub(crate) fn build_client(timeout: Duration) -> Result<Client, GatewayError> {
    Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(32)
        .build()
        .map_err(|e| GatewayError::internal(format!("Failed to create HTTP client: {e}")))
}

/// Request-level value wins; otherwise the adapter default; otherwise a configuration error
pub(crate) fn resolve_credential<'a>(
    provider: ProviderType,
    requested: &'a str,
    default: Option<&'a SecretString>,
    what: &str,
) -> Result<&'a str, GatewayError> {
    if !requested.is_empty() {
        return Ok(requested);
    }
    default
        .map(|s| s.expose_secret().as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            GatewayError::configuration(format!("{provider}: {what} is required, none provided"))
        })
}

/// Map a reqwest failure onto the router taxonomy
pub(crate) fn map_request_error(
    provider: ProviderType,
    timeout: Duration,
    err: &reqwest::Error,
) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout {
            provider: provider.to_string(),
            timeout,
        }
    } else if err.is_decode() {
        GatewayError::decode(provider.to_string(), err.to_string())
    } else {
        GatewayError::transport(provider.to_string(), err.to_string())
    }
}

/// Check the status and decode a JSON body
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: ProviderType,
    timeout: Duration,
    response: Response,
) -> Result<T, GatewayError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| map_request_error(provider, timeout, &e))?;

    if !status.is_success() {
        warn!(provider = %provider, status = %status, "Upstream returned error status");
        return Err(GatewayError::upstream(
            provider.to_string(),
            status.as_u16(),
            body,
        ));
    }

    debug!(provider = %provider, bytes = body.len(), "Upstream response received");
    serde_json::from_str(&body)
        .map_err(|e| GatewayError::decode(provider.to_string(), e.to_string()))
}

/// Join a base URL and a path without doubling slashes
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
