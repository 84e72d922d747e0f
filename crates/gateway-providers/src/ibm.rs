//! IBM job API provider.
//!
//! Submits a synchronous job to `{base}/api/v1/jobs`. Requests are authorized
//! with a bearer key and identify the caller through the `Email` header, so both
//! a key and a user e-mail are required. Model output is expected to be YAML
//! wrapped in a markdown fence; the adapter strips the fence and validates the
//! YAML before answering.

use async_trait::async_trait;
use gateway_core::{Filter, GatewayError, LLMProvider, ModelInput, ModelResponse, ProviderType};
use gateway_filters::{MarkdownStripper, YamlLinter};
use reqwest::Client;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::http::{build_client, join_url, map_request_error, read_json, resolve_credential};

/// Default IBM endpoint
pub const DEFAULT_BASE_URL: &str = "https://bam-api.res.ibm.com";

/// Task sent with every job
pub const TASK_ID: &str = "yaml-only-raw-output";

/// IBM provider configuration
#[derive(Debug, Clone)]
pub struct IbmConfig {
    /// Model identifier
    pub model_id: String,
    /// Base URL
    pub base_url: String,
    /// Default caller e-mail
    pub user_id: Option<String>,
    /// Default API key
    pub api_key: Option<SecretString>,
    /// Request timeout
    pub timeout: Duration,
}

impl IbmConfig {
    /// Create a configuration for `model_id` against the public endpoint
    #[must_use]
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_id: None,
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

    /// Set the default caller e-mail
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
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

/// IBM provider implementation
pub struct IbmProvider {
    config: IbmConfig,
    user_id: Option<SecretString>,
    client: Client,
    filter: Filter,
}

impl IbmProvider {
    /// Create a new IBM provider with the markdown stripper and YAML linter attached
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created
    pub fn new(config: IbmConfig) -> Result<Self, GatewayError> {
        let client = build_client(config.timeout)?;
        let filter = Filter::new()
            .with_response_stage(Arc::new(MarkdownStripper::new()?))
            .with_response_stage(Arc::new(YamlLinter::new()));
        let user_id = config.user_id.clone().map(SecretString::new);

        Ok(Self {
            config,
            user_id,
            client,
            filter,
        })
    }

    fn jobs_url(&self) -> String {
        join_url(&self.config.base_url, "/api/v1/jobs")
    }
}

#[async_trait]
impl LLMProvider for IbmProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Ibm
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn filter(&self) -> &Filter {
        &self.filter
    }

    async fn invoke(&self, input: &ModelInput) -> Result<ModelResponse, GatewayError> {
        let user_id = resolve_credential(
            ProviderType::Ibm,
            &input.user_id,
            self.user_id.as_ref(),
            "user email address",
        )?;
        let api_key = resolve_credential(
            ProviderType::Ibm,
            &input.api_key,
            self.config.api_key.as_ref(),
            "api key",
        )?;

        let url = self.jobs_url();
        let payload = IbmJobRequest {
            prompt: &input.prompt,
            model_id: &self.config.model_id,
            task_id: TASK_ID,
            mode: "synchronous",
        };

        debug!(model = %self.config.model_id, url = %url, "Submitting IBM job");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .header("Email", user_id)
            .json(&payload)
            .send()
            .await
            .map_err(|e| map_request_error(ProviderType::Ibm, self.config.timeout, &e))?;

        let job: IbmJobResponse = read_json(ProviderType::Ibm, self.config.timeout, response).await?;

        Ok(ModelResponse {
            input_echo: input.prompt.clone(),
            status: job.status,
            request_id: job.job_id,
            conversation_id: input.conversation_id.clone(),
            output: job.task_output,
            raw_output: job.all_tokens,
            error_message: String::new(),
        })
    }
}

#[derive(Debug, Serialize)]
struct IbmJobRequest<'a> {
    prompt: &'a str,
    model_id: &'a str,
    task_id: &'a str,
    mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct IbmJobResponse {
    #[serde(default)]
    all_tokens: String,
    #[serde(default)]
    job_id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    task_output: String,
}
