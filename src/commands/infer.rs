//! Infer command - run one prompt through the configured models.

use anyhow::{Context, Result};
use clap::Args;
use gateway_config::GatewayConfig;
use gateway_core::{invoke_model, ModelInput, ModelResponse};
use gateway_providers::ProviderRegistry;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Arguments for the infer command.
#[derive(Args, Debug)]
pub struct InferArgs {
    /// Configuration file
    #[arg(short, long, env = "ROUTER_CONFIG", default_value = "router.yaml")]
    pub config: PathBuf,

    /// Prompt to send
    #[arg(short, long)]
    pub inference: String,

    /// Provider; defaults to `defaultProvider`
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Model id; defaults to `defaultModelId`
    #[arg(short, long)]
    pub model: Option<String>,
}

/// Execute the infer command.
pub async fn execute(args: InferArgs) -> Result<()> {
    let config = gateway_config::load_config(&args.config)
        .await
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    for warning in config.validate().context("invalid configuration")? {
        warn!("{warning}");
    }

    let response = run(&config, &args).await?;
    if response.is_error() {
        warn!(error = %response.error_message, "Output did not pass response filters");
    }
    println!("Response:\n{}", response.output);
    Ok(())
}

/// Resolve the target model and invoke it
async fn run(config: &GatewayConfig, args: &InferArgs) -> Result<ModelResponse> {
    let registry = ProviderRegistry::from_config(config);

    let mut input = ModelInput::new(&args.inference);
    if let Some(provider) = &args.provider {
        input = input.with_provider(provider);
    }
    if let Some(model) = &args.model {
        input = input.with_model_id(model);
    }
    input.apply_defaults(&config.default_provider, &config.default_model_id);

    let provider = registry.get(&input.provider, &input.model_id)?;

    match invoke_model(input, provider.as_ref()).await {
        Ok(response) => Ok(response),
        Err(err) => {
            debug!(error_message = %err.response().error_message, "Inference failed");
            if err.is_soft() {
                Ok(err.into_response())
            } else {
                Err(err.error().clone().into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(provider: Option<&str>) -> InferArgs {
        InferArgs {
            config: PathBuf::from("unused.yaml"),
            inference: "list pods".to_string(),
            provider: provider.map(String::from),
            model: Some("gpt-4".to_string()),
        }
    }

    #[tokio::test]
    async fn test_unknown_model_is_an_error() {
        let config = GatewayConfig::from_yaml(
            r"
defaultProvider: openai
defaultModelId: gpt-3.5-turbo
models:
  - provider: openai
    modelId: gpt-3.5-turbo
",
        )
        .unwrap();

        let err = run(&config, &args(None)).await.unwrap_err();
        assert!(err.to_string().contains("openai/gpt-4"));
    }

    #[tokio::test]
    async fn test_missing_key_is_an_error() {
        let config = GatewayConfig::from_yaml(
            r"
models:
  - provider: openai
    modelId: gpt-4
    url: http://127.0.0.1:9
",
        )
        .unwrap();

        let err = run(&config, &args(Some("openai"))).await.unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[tokio::test]
    async fn test_provider_flag_is_case_insensitive() {
        let config = GatewayConfig::from_yaml(
            r"
models:
  - provider: openai
    modelId: gpt-4
    url: http://127.0.0.1:9
",
        )
        .unwrap();

        // resolves the model, then fails on the missing key before any I/O
        let err = run(&config, &args(Some("OpenAI"))).await.unwrap_err();
        assert!(err.to_string().contains("required"));
    }
}
