//! Shared application state.

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use gateway_config::GatewayConfig;
use gateway_providers::ProviderRegistry;
use gateway_telemetry::{Metrics, MetricsConfig};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    auth::{AuthConfig, AuthState},
    oauth::{OAuthClient, OAuthConfig},
    server::ServerError,
};

/// Provider and model used when a request leaves them blank
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingDefaults {
    /// Default provider name
    pub provider: String,
    /// Default model id
    pub model_id: String,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Registered model adapters
    pub providers: Arc<ProviderRegistry>,
    /// Fallback provider/model
    pub defaults: Arc<RoutingDefaults>,
    /// Bearer authentication
    pub auth: AuthState,
    /// Login flow, when configured
    pub oauth: Option<OAuthClient>,
    /// Metrics
    pub metrics: Metrics,
    cookie_key: Key,
}

impl AppState {
    /// Create a builder
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }

    /// Build the full state from a loaded configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ServerError> {
        let server = &config.server_config;
        let registry = ProviderRegistry::from_config(config);
        if registry.is_empty() {
            warn!("No models registered; every inference request will be rejected");
        }

        let auth = AuthConfig::from_server_config(server)?;
        if auth.is_disabled() {
            warn!("No bearer authentication configured; every inference request will be rejected");
        }

        let mut builder = Self::builder()
            .providers(registry)
            .defaults(&config.default_provider, &config.default_model_id)
            .auth(AuthState::new(auth));

        if let Some(key) = server.session_key()? {
            builder = builder.cookie_key(
                Key::try_from(key.as_slice()).map_err(|e| ServerError::Setup(e.to_string()))?,
            );
        }

        if let Some(oauth_config) = OAuthConfig::from_server_config(server) {
            info!(authorize_url = %oauth_config.authorize_url, "OAuth login enabled");
            let client = OAuthClient::new(oauth_config, server.session_ttl)
                .map_err(|e| ServerError::Setup(e.to_string()))?;
            builder = builder.oauth(client);
        }

        builder.build()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("providers", &self.providers)
            .field("defaults", &self.defaults)
            .field("oauth", &self.oauth.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`AppState`]
#[derive(Default)]
pub struct AppStateBuilder {
    providers: Option<ProviderRegistry>,
    defaults: RoutingDefaults,
    auth: Option<AuthState>,
    oauth: Option<OAuthClient>,
    metrics: Option<Metrics>,
    cookie_key: Option<Key>,
}

impl AppStateBuilder {
    /// Set the provider registry
    #[must_use]
    pub fn providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = Some(providers);
        self
    }

    /// Set the default provider and model
    #[must_use]
    pub fn defaults(mut self, provider: impl Into<String>, model_id: impl Into<String>) -> Self {
        self.defaults = RoutingDefaults {
            provider: provider.into(),
            model_id: model_id.into(),
        };
        self
    }

    /// Set the authentication state
    #[must_use]
    pub fn auth(mut self, auth: AuthState) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Enable the login flow
    #[must_use]
    pub fn oauth(mut self, oauth: OAuthClient) -> Self {
        self.oauth = Some(oauth);
        self
    }

    /// Set metrics
    #[must_use]
    pub fn metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Set the session cookie signing key
    #[must_use]
    pub fn cookie_key(mut self, key: Key) -> Self {
        self.cookie_key = Some(key);
        self
    }

    /// Build the state.
    ///
    /// Missing parts default to an empty registry, no authentication, fresh
    /// metrics and a random cookie key.
    pub fn build(self) -> Result<AppState, ServerError> {
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => Metrics::new(&MetricsConfig::default())?,
        };

        Ok(AppState {
            providers: Arc::new(self.providers.unwrap_or_default()),
            defaults: Arc::new(self.defaults),
            auth: self
                .auth
                .unwrap_or_else(|| AuthState::new(AuthConfig::default())),
            oauth: self.oauth,
            metrics,
            cookie_key: self.cookie_key.unwrap_or_else(Key::generate),
        })
    }
}
