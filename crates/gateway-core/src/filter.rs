//! Filter chains.
//!
//! A [`Filter`] holds two ordered lists of stages: one applied to the request
//! before it goes upstream, one applied to the response after it comes back.
//! Stages run in order and the chain stops at the first failure, handing back
//! the value produced so far together with the error.

use crate::{error::GatewayError, request::ModelInput, response::ModelResponse};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One transform-or-fail step over a value of type `T`
pub trait FilterStage<T>: Send + Sync {
    /// Stage name, used in logs and rejection errors
    fn name(&self) -> &'static str;

    /// Produce the next value, or reject the current one
    fn apply(&self, value: &T) -> Result<T, GatewayError>;
}

/// Stage applied to outbound requests
pub type InputFilter = dyn FilterStage<ModelInput>;

/// Stage applied to inbound responses
pub type ResponseFilter = dyn FilterStage<ModelResponse>;

/// Chain failure: the last good value plus the rejecting stage's error
#[derive(Debug, Clone, thiserror::Error)]
#[error("{source}")]
pub struct FilterError<T> {
    /// Value produced by the stages before the failing one
    pub partial: T,
    /// Error raised by the failing stage
    pub source: GatewayError,
}

/// Ordered input and response stages owned by an adapter
#[derive(Clone, Default)]
pub struct Filter {
    input: Vec<Arc<InputFilter>>,
    response: Vec<Arc<ResponseFilter>>,
}

impl Filter {
    /// Empty chain, passes values through unchanged
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an input stage
    #[must_use]
    pub fn with_input_stage(mut self, stage: Arc<InputFilter>) -> Self {
        self.input.push(stage);
        self
    }

    /// Append a response stage
    #[must_use]
    pub fn with_response_stage(mut self, stage: Arc<ResponseFilter>) -> Self {
        self.response.push(stage);
        self
    }

    /// Whether the chain has no stages at all
    pub fn is_empty(&self) -> bool {
        self.input.is_empty() && self.response.is_empty()
    }

    /// Names of the input stages, in order
    pub fn input_stage_names(&self) -> Vec<&'static str> {
        self.input.iter().map(|s| s.name()).collect()
    }

    /// Names of the response stages, in order
    pub fn response_stage_names(&self) -> Vec<&'static str> {
        self.response.iter().map(|s| s.name()).collect()
    }

    /// Run the input stages over a request
    pub fn filter_input(&self, input: ModelInput) -> Result<ModelInput, FilterError<ModelInput>> {
        run_chain(&self.input, input)
    }

    /// Run the response stages over a response
    pub fn filter_response(
        &self,
        response: ModelResponse,
    ) -> Result<ModelResponse, FilterError<ModelResponse>> {
        run_chain(&self.response, response)
    }
}

fn run_chain<T>(stages: &[Arc<dyn FilterStage<T>>], initial: T) -> Result<T, FilterError<T>> {
    let mut current = initial;
    for stage in stages {
        match stage.apply(&current) {
            Ok(next) => current = next,
            Err(source) => {
                debug!(stage = stage.name(), error = %source, "Filter stage rejected value");
                return Err(FilterError {
                    partial: current,
                    source,
                });
            }
        }
    }
    Ok(current)
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("input", &self.input_stage_names())
            .field("response", &self.response_stage_names())
            .finish()
    }
}
