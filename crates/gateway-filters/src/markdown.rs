//! Markdown fence stripper.
//!
//! Models frequently wrap generated YAML in a fenced code block. This stage
//! keeps only the contents of the first block. Output without any fenced block
//! is rejected, and the rejected response is returned unmodified.

use gateway_core::{FilterStage, GatewayError, ModelResponse};
use regex::Regex;
use tracing::debug;

/// Opening fence with optional info string, then the body up to the first closing fence.
const FENCED_BLOCK: &str = r"(?s)```[^\n]*\n(.*?)```";

/// Stage name reported in rejections
pub const STAGE_NAME: &str = "markdown-stripper";

/// Extracts the body of the first fenced code block
#[derive(Debug, Clone)]
pub struct MarkdownStripper {
    pattern: Regex,
}

impl MarkdownStripper {
    /// Create the stage
    ///
    /// # Errors
    /// Returns error if the fence pattern fails to compile
    pub fn new() -> Result<Self, GatewayError> {
        let pattern = Regex::new(FENCED_BLOCK)
            .map_err(|e| GatewayError::internal(format!("Invalid fence pattern: {e}")))?;
        Ok(Self { pattern })
    }

    /// Body of the first fenced block, if any
    pub fn extract<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

impl FilterStage<ModelResponse> for MarkdownStripper {
    fn name(&self) -> &'static str {
        STAGE_NAME
    }

    fn apply(&self, value: &ModelResponse) -> Result<ModelResponse, GatewayError> {
        if value.output.is_empty() {
            return Err(GatewayError::filter_rejection(
                STAGE_NAME,
                "response output is empty",
            ));
        }
        debug!(output = %value.output, "Stripping markdown from response");

        let body = self.extract(&value.output).ok_or_else(|| {
            GatewayError::filter_rejection(
                STAGE_NAME,
                "response output contains no fenced code block",
            )
        })?;

        debug!(output = %body, "Stripped markdown from response");
        Ok(value.clone().with_output(body))
    }
}
