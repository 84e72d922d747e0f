//! Invocation orchestrator.
//!
//! [`invoke_model`] is the single entry point for running a request through an
//! adapter: input filters, the upstream call, then response filters. Every path
//! yields a [`ModelResponse`]; on failure it travels inside [`InvocationError`]
//! with `error_message` set.

use crate::{
    error::GatewayError, provider::LLMProvider, request::ModelInput, response::ModelResponse,
};
use tracing::{debug, warn};

/// Step of the pipeline that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStage {
    /// Input filtering rejected the request; the adapter was never called
    InputFilter,
    /// The adapter call failed
    Provider,
    /// Response filtering rejected the output; the upstream call succeeded
    ResponseFilter,
}

/// Failed invocation, carrying the best available response
#[derive(Debug, Clone, thiserror::Error)]
#[error("{source}")]
pub struct InvocationError {
    response: ModelResponse,
    source: GatewayError,
    stage: InvocationStage,
}

impl InvocationError {
    /// Response to return to the caller, `error_message` populated
    pub fn response(&self) -> &ModelResponse {
        &self.response
    }

    /// Take ownership of the response
    pub fn into_response(self) -> ModelResponse {
        self.response
    }

    /// Underlying error
    pub fn error(&self) -> &GatewayError {
        &self.source
    }

    /// Failing step
    pub fn stage(&self) -> InvocationStage {
        self.stage
    }

    /// Soft failures happen after the upstream answered; the output is still usable
    pub fn is_soft(&self) -> bool {
        self.stage == InvocationStage::ResponseFilter
    }
}

/// Run `input` through `provider` and its filter chain.
///
/// Input filter failure is a hard failure and skips the upstream call. An
/// adapter error skips response filtering. A response filter failure keeps the
/// upstream output and reports a soft failure.
pub async fn invoke_model(
    input: ModelInput,
    provider: &dyn LLMProvider,
) -> Result<ModelResponse, InvocationError> {
    let key = provider.key();
    let mut response = ModelResponse {
        conversation_id: input.conversation_id.clone(),
        ..Default::default()
    };

    let input = match provider.filter().filter_input(input) {
        Ok(filtered) => filtered,
        Err(err) => {
            warn!(provider = %key, error = %err.source, "Input filtering failed");
            response.error_message = format!("error filtering input: {}", err.source);
            return Err(InvocationError {
                response,
                source: err.source,
                stage: InvocationStage::InputFilter,
            });
        }
    };

    debug!(provider = %key, "Invoking provider");

    let upstream = match provider.invoke(&input).await {
        Ok(upstream) => upstream,
        Err(source) => {
            warn!(provider = %key, error = %source, "Provider invocation failed");
            response.input_echo = input.prompt;
            response.error_message = source.to_string();
            return Err(InvocationError {
                response,
                source,
                stage: InvocationStage::Provider,
            });
        }
    };

    match provider.filter().filter_response(upstream) {
        Ok(filtered) => Ok(filtered),
        Err(err) => {
            warn!(provider = %key, error = %err.source, "Response filtering failed");
            let mut response = err.partial;
            response.error_message = err.source.to_string();
            Err(InvocationError {
                response,
                source: err.source,
                stage: InvocationStage::ResponseFilter,
            })
        }
    }
}
