//! Normalized inbound request.
//!
//! Every provider adapter consumes the same [`ModelInput`]. The JSON field
//! names are part of the public wire contract and must not change.

use crate::provider::ProviderKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized prompt request, independent of the target backend
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInput {
    /// Caller identity (an e-mail for the IBM backend)
    #[serde(rename = "userid", default)]
    pub user_id: String,

    /// Per-request credential, overrides the adapter default when set
    #[serde(rename = "apikey", default)]
    pub api_key: String,

    /// Target model identifier
    #[serde(rename = "modelId", default)]
    pub model_id: String,

    /// Target provider name
    #[serde(default)]
    pub provider: String,

    /// Prompt text
    #[serde(default)]
    pub prompt: String,

    /// Free-form context supplied by the caller
    #[serde(default)]
    pub context: String,

    /// Conversation identifier, echoed back in the response
    #[serde(rename = "conversationId", default)]
    pub conversation_id: String,
}

impl ModelInput {
    /// Create a request for the given prompt
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Set the target provider
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Set the target model
    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Set the per-request credential
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set the caller identity
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Set the caller context
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Set the conversation identifier
    #[must_use]
    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = conversation_id.into();
        self
    }

    /// Backfill provider and model from server defaults when the caller left them empty
    pub fn apply_defaults(&mut self, default_provider: &str, default_model_id: &str) {
        if self.provider.is_empty() {
            self.provider = default_provider.to_string();
        }
        if self.model_id.is_empty() {
            self.model_id = default_model_id.to_string();
        }
    }

    /// Composite registry key for this request
    pub fn key(&self) -> ProviderKey {
        ProviderKey::new(&self.provider, &self.model_id)
    }
}

// Hand-written so per-request credentials never reach the logs.
impl fmt::Debug for ModelInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelInput")
            .field("user_id", &self.user_id)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "[REDACTED]" })
            .field("model_id", &self.model_id)
            .field("provider", &self.provider)
            .field("prompt", &self.prompt)
            .field("context", &self.context)
            .field("conversation_id", &self.conversation_id)
            .finish()
    }
}
