//! HuggingFace inference API provider (text generation task).

use async_trait::async_trait;
use gateway_core::{Filter, GatewayError, LLMProvider, ModelInput, ModelResponse, ProviderType};
use reqwest::Client;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::http::{build_client, join_url, map_request_error, read_json, resolve_credential};

/// Default HuggingFace inference endpoint
pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Generation parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationParameters {
    /// Upper bound on generated tokens
    pub max_new_tokens: u32,
    /// Upper bound on generation time, in seconds
    pub max_time: f64,
    /// Number of candidate sequences
    pub num_return_sequences: u32,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            max_new_tokens: 100,
            max_time: 30.0,
            num_return_sequences: 2,
        }
    }
}

/// HuggingFace provider configuration
#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    /// Model identifier, e.g. `bigcode/starcoder`
    pub model_id: String,
    /// Base URL
    pub base_url: String,
    /// Default API key
    pub api_key: Option<SecretString>,
    /// Request timeout
    pub timeout: Duration,
    /// Generation parameters
    pub parameters: GenerationParameters,
}

impl HuggingFaceConfig {
    /// Create a configuration for `model_id` against the public endpoint
    #[must_use]
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
            parameters: GenerationParameters::default(),
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the default API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HuggingFace provider implementation
pub struct HuggingFaceProvider {
    config: HuggingFaceConfig,
    client: Client,
    filter: Filter,
}

impl HuggingFaceProvider {
    /// Create a new HuggingFace provider
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created
    pub fn new(config: HuggingFaceConfig) -> Result<Self, GatewayError> {
        let client = build_client(config.timeout)?;
        Ok(Self {
            config,
            client,
            filter: Filter::new(),
        })
    }

    fn model_url(&self) -> String {
        join_url(
            &self.config.base_url,
            &format!("/models/{}", self.config.model_id),
        )
    }
}

#[async_trait]
impl LLMProvider for HuggingFaceProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::HuggingFace
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn filter(&self) -> &Filter {
        &self.filter
    }

    async fn invoke(&self, input: &ModelInput) -> Result<ModelResponse, GatewayError> {
        let api_key = resolve_credential(
            ProviderType::HuggingFace,
            &input.api_key,
            self.config.api_key.as_ref(),
            "api key",
        )?;

        let url = self.model_url();
        let request = TextGenerationRequest {
            inputs: &input.prompt,
            parameters: self.config.parameters,
        };

        debug!(model = %self.config.model_id, url = %url, "Sending text generation request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_request_error(ProviderType::HuggingFace, self.config.timeout, &e))?;

        let generations: Vec<TextGeneration> =
            read_json(ProviderType::HuggingFace, self.config.timeout, response).await?;

        let output = generations
            .first()
            .map(|g| g.generated_text.clone())
            .ok_or_else(|| {
                GatewayError::decode(
                    ProviderType::HuggingFace.to_string(),
                    "model returned no generated text",
                )
            })?;
        let raw_output = generations
            .iter()
            .map(|g| g.generated_text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ModelResponse {
            input_echo: input.prompt.clone(),
            status: String::new(),
            request_id: String::new(),
            conversation_id: input.conversation_id.clone(),
            output,
            raw_output,
            error_message: String::new(),
        })
    }
}

#[derive(Debug, Serialize)]
struct TextGenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Debug, Deserialize)]
struct TextGeneration {
    #[serde(default)]
    generated_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_text_generation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/bigcode/starcoder"))
            .and(header("Authorization", "Bearer hf-key"))
            .and(body_json(serde_json::json!({
                "inputs": "list pods",
                "parameters": {
                    "max_new_tokens": 100,
                    "max_time": 30.0,
                    "num_return_sequences": 2
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "generated_text": "kubectl get pods" },
                { "generated_text": "kubectl get po" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HuggingFaceProvider::new(
            HuggingFaceConfig::new("bigcode/starcoder")
                .with_base_url(server.uri())
                .with_api_key("hf-key"),
        )
        .unwrap();

        let response = provider.invoke(&ModelInput::new("list pods")).await.unwrap();
        assert_eq!(response.output, "kubectl get pods");
        assert_eq!(response.raw_output, "kubectl get pods\nkubectl get po");
        assert_eq!(response.input_echo, "list pods");
        assert!(provider.filter().is_empty());
    }

    #[tokio::test]
    async fn test_empty_generation_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let provider = HuggingFaceProvider::new(
            HuggingFaceConfig::new("gpt2")
                .with_base_url(server.uri())
                .with_api_key("hf-key"),
        )
        .unwrap();

        let err = provider.invoke(&ModelInput::new("p")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider =
            HuggingFaceProvider::new(HuggingFaceConfig::new("gpt2").with_base_url(server.uri()))
                .unwrap();

        let err = provider.invoke(&ModelInput::new("p")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Configuration { .. }));
    }
}
