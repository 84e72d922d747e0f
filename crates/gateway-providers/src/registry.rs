//! Provider registry.
//!
//! Built once at startup from the configured model list and never mutated
//! afterwards. Lookups are by the composite key `provider/modelId`.

use gateway_config::{GatewayConfig, ModelConfig};
use gateway_core::{GatewayError, LLMProvider, ProviderKey, ProviderType};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::{
    HuggingFaceConfig, HuggingFaceProvider, IbmConfig, IbmProvider, OpenAIConfig, OpenAIProvider,
};

/// Immutable map from `provider/modelId` to adapter
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKey, Arc<dyn LLMProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from configuration.
    ///
    /// Entries with an unknown provider, or whose adapter fails to build, are
    /// logged and skipped.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let default_timeout = config.server_config.upstream_timeout;
        let mut registry = Self::new();

        for model in &config.models {
            match create_provider(model, default_timeout) {
                Ok(provider) => {
                    info!(key = %provider.key(), url = %model.url, "Registered model");
                    registry = registry.with_provider(provider);
                }
                Err(e) => {
                    error!(
                        provider = %model.provider,
                        model = %model.model_id,
                        error = %e,
                        "Skipping model entry"
                    );
                }
            }
        }

        info!(models = registry.len(), "Provider registry initialized");
        registry
    }

    /// Add an adapter under its own key, replacing any previous one
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.providers.insert(provider.key(), provider);
        self
    }

    /// Look up the adapter for `provider/model_id`. The provider name is
    /// matched case-insensitively.
    pub fn get(&self, provider: &str, model_id: &str) -> Result<Arc<dyn LLMProvider>, GatewayError> {
        let key = ProviderKey::new(provider, model_id);
        self.providers.get(&key).cloned().ok_or_else(|| {
            GatewayError::model_not_found(key.to_string(), self.keys())
        })
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.providers.keys().map(ToString::to_string).collect();
        keys.sort();
        keys
    }

    /// Number of registered adapters
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no adapter is registered
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.keys())
            .finish()
    }
}

/// Build one adapter from its configuration entry
pub fn create_provider(
    model: &ModelConfig,
    default_timeout: Duration,
) -> Result<Arc<dyn LLMProvider>, GatewayError> {
    let kind: ProviderType = model.provider.parse()?;
    let timeout = model.timeout.unwrap_or(default_timeout);

    let provider: Arc<dyn LLMProvider> = match kind {
        ProviderType::Ibm => {
            let mut config = IbmConfig::new(&model.model_id).with_timeout(timeout);
            if !model.url.is_empty() {
                config = config.with_base_url(&model.url);
            }
            if !model.user_id.is_empty() {
                config = config.with_user_id(&model.user_id);
            }
            if let Some(key) = model.api_key() {
                config = config.with_api_key(key);
            }
            Arc::new(IbmProvider::new(config)?)
        }
        ProviderType::OpenAI => {
            let mut config = OpenAIConfig::new(&model.model_id).with_timeout(timeout);
            if !model.url.is_empty() {
                config = config.with_base_url(&model.url);
            }
            if let Some(key) = model.api_key() {
                config = config.with_api_key(key);
            }
            Arc::new(OpenAIProvider::new(config)?)
        }
        ProviderType::HuggingFace => {
            let mut config = HuggingFaceConfig::new(&model.model_id).with_timeout(timeout);
            if !model.url.is_empty() {
                config = config.with_base_url(&model.url);
            }
            if let Some(key) = model.api_key() {
                config = config.with_api_key(key);
            }
            Arc::new(HuggingFaceProvider::new(config)?)
        }
    };

    Ok(provider)
}
