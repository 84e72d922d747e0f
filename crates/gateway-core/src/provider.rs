//! Provider abstraction.
//!
//! Each backend adapter implements [`LLMProvider`]. Adapters are immutable
//! after construction and shared across requests behind an `Arc`.

use crate::{error::GatewayError, filter::Filter, request::ModelInput, response::ModelResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// IBM job API
    Ibm,
    /// OpenAI chat completions
    OpenAI,
    /// HuggingFace inference API
    HuggingFace,
}

impl ProviderType {
    /// Canonical lowercase name, as used in config files and registry keys
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ibm => "ibm",
            Self::OpenAI => "openai",
            Self::HuggingFace => "huggingface",
        }
    }

    /// All supported kinds
    pub const fn all() -> [Self; 3] {
        [Self::Ibm, Self::OpenAI, Self::HuggingFace]
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ibm" => Ok(Self::Ibm),
            "openai" => Ok(Self::OpenAI),
            "huggingface" => Ok(Self::HuggingFace),
            other => Err(GatewayError::configuration(format!(
                "unknown provider '{other}', expected one of: ibm, openai, huggingface"
            ))),
        }
    }
}

/// Composite registry key, rendered as `provider/modelId`.
///
/// The provider part is stored lowercase, so `OpenAI/gpt-4` and
/// `openai/gpt-4` name the same model. Model ids are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderKey {
    provider: String,
    model_id: String,
}

impl ProviderKey {
    /// Create a key
    pub fn new(provider: impl Into<String>, model_id: impl Into<String>) -> Self {
        let mut provider = provider.into();
        provider.make_ascii_lowercase();
        Self {
            provider,
            model_id: model_id.into(),
        }
    }

    /// Provider part
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Model part
    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model_id)
    }
}

/// A backend adapter
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Backend kind
    fn provider_type(&self) -> ProviderType;

    /// Model served by this adapter
    fn model_id(&self) -> &str;

    /// Registry key for this adapter
    fn key(&self) -> ProviderKey {
        ProviderKey::new(self.provider_type().as_str(), self.model_id())
    }

    /// Pre- and post-processing stages applied around [`LLMProvider::invoke`]
    fn filter(&self) -> &Filter;

    /// Send one request upstream and normalize the answer.
    ///
    /// Fails with [`GatewayError::Configuration`] before any network I/O when
    /// a required credential is neither on the request nor on the adapter.
    async fn invoke(&self, input: &ModelInput) -> Result<ModelResponse, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!("ibm".parse::<ProviderType>().unwrap(), ProviderType::Ibm);
        assert_eq!("OpenAI".parse::<ProviderType>().unwrap(), ProviderType::OpenAI);
        assert_eq!(
            "huggingface".parse::<ProviderType>().unwrap(),
            ProviderType::HuggingFace
        );
        assert!("anthropic".parse::<ProviderType>().is_err());
    }

    #[test]
    fn test_provider_key_ignores_provider_case() {
        let key = ProviderKey::new("OpenAI", "gpt-4");
        assert_eq!(key, ProviderKey::new("openai", "gpt-4"));
        assert_eq!(key.to_string(), "openai/gpt-4");
        assert_ne!(key, ProviderKey::new("openai", "GPT-4"));
    }

    #[test]
    fn test_provider_type_serde_matches_display() {
        for kind in ProviderType::all() {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn test_key_display() {
        let key = ProviderKey::new("ibm", "granite-3b");
        assert_eq!(key.to_string(), "ibm/granite-3b");
        assert_eq!(key.provider(), "ibm");
        assert_eq!(key.model_id(), "granite-3b");
    }
}
