//! OpenAI chat-completions provider.

use async_trait::async_trait;
use gateway_core::{Filter, GatewayError, LLMProvider, ModelInput, ModelResponse, ProviderType};
use reqwest::Client;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::http::{build_client, join_url, map_request_error, read_json, resolve_credential};

/// Default OpenAI endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI provider configuration
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Model identifier
    pub model_id: String,
    /// Base URL
    pub base_url: String,
    /// Default API key
    pub api_key: Option<SecretString>,
    /// Request timeout
    pub timeout: Duration,
}

impl OpenAIConfig {
    /// Create a configuration for `model_id` against the public endpoint
    #[must_use]
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
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

/// OpenAI provider implementation
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
    filter: Filter,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created
    pub fn new(config: OpenAIConfig) -> Result<Self, GatewayError> {
        let client = build_client(config.timeout)?;
        Ok(Self {
            config,
            client,
            filter: Filter::new(),
        })
    }

    fn completions_url(&self) -> String {
        join_url(&self.config.base_url, "/v1/chat/completions")
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn filter(&self) -> &Filter {
        &self.filter
    }

    async fn invoke(&self, input: &ModelInput) -> Result<ModelResponse, GatewayError> {
        let api_key = resolve_credential(
            ProviderType::OpenAI,
            &input.api_key,
            self.config.api_key.as_ref(),
            "api key",
        )?;

        let url = self.completions_url();
        let request = ChatRequest {
            model: &self.config.model_id,
            messages: vec![ChatMessage {
                role: "user",
                content: &input.prompt,
            }],
        };

        debug!(model = %self.config.model_id, url = %url, "Sending request to OpenAI");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_request_error(ProviderType::OpenAI, self.config.timeout, &e))?;

        let completion: ChatResponse =
            read_json(ProviderType::OpenAI, self.config.timeout, response).await?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| {
                GatewayError::decode(
                    ProviderType::OpenAI.to_string(),
                    "model returned no valid responses",
                )
            })?;

        Ok(ModelResponse {
            input_echo: input.prompt.clone(),
            status: String::new(),
            request_id: completion.id,
            conversation_id: input.conversation_id.clone(),
            output: content.clone(),
            raw_output: content,
            error_message: String::new(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::invoke_model;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, api_key: Option<&str>) -> OpenAIProvider {
        let mut config = OpenAIConfig::new("gpt-3.5-turbo").with_base_url(server.uri());
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }
        OpenAIProvider::new(config).unwrap()
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    #[test]
    fn test_no_filters() {
        let provider = OpenAIProvider::new(OpenAIConfig::new("gpt-4")).unwrap();
        assert!(provider.filter().is_empty());
        assert_eq!(provider.key().to_string(), "openai/gpt-4");
    }

    #[tokio::test]
    async fn test_list_pods_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-adapter"))
            .and(body_json(serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [{ "role": "user", "content": "list pods" }]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("- kubernetes.core.k8s_info:\n    kind: Pod\n")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server, Some("sk-adapter"));
        let input = ModelInput::new("list pods")
            .with_provider("openai")
            .with_model_id("gpt-3.5-turbo");
        let response = invoke_model(input, &provider).await.unwrap();

        assert_eq!(response.output, "- kubernetes.core.k8s_info:\n    kind: Pod\n");
        assert_eq!(response.raw_output, response.output);
        assert_eq!(response.request_id, "chatcmpl-1");
        assert!(response.error_message.is_empty());
    }

    #[tokio::test]
    async fn test_request_key_overrides_adapter_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Authorization", "Bearer sk-request"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server, Some("sk-adapter"));
        let response = provider
            .invoke(&ModelInput::new("p").with_api_key("sk-request"))
            .await
            .unwrap();
        assert_eq!(response.output, "ok");
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
            .expect(0)
            .mount(&server)
            .await;

        let provider = provider(&server, None);
        let err = provider.invoke(&ModelInput::new("p")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_upstream_500_is_hard_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let provider = provider(&server, Some("sk"));
        let err = invoke_model(ModelInput::new("p"), &provider)
            .await
            .unwrap_err();

        assert!(!err.is_soft());
        assert!(matches!(err.error(), GatewayError::Upstream { status: 500, .. }));
        assert!(err.response().error_message.contains("500"));
    }

    #[tokio::test]
    async fn test_no_choices_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "x", "choices": []})),
            )
            .mount(&server)
            .await;

        let err = provider(&server, Some("sk"))
            .invoke(&ModelInput::new("p"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Decode { .. }));
        assert!(err.to_string().contains("model returned no valid responses"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = provider(&server, Some("sk"))
            .invoke(&ModelInput::new("p"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("late"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let provider = OpenAIProvider::new(
            OpenAIConfig::new("gpt-4")
                .with_base_url(server.uri())
                .with_api_key("sk")
                .with_timeout(Duration::from_millis(50)),
        )
        .unwrap();

        let err = provider.invoke(&ModelInput::new("p")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout { .. }));
    }
}
