//! YAML syntax validator.

use gateway_core::{FilterStage, GatewayError, ModelResponse};
use tracing::debug;

/// Stage name reported in rejections
pub const STAGE_NAME: &str = "yaml-linter";

/// Rejects output that does not parse as YAML. Never rewrites the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlLinter;

impl YamlLinter {
    /// Create the stage
    pub fn new() -> Self {
        Self
    }
}

impl FilterStage<ModelResponse> for YamlLinter {
    fn name(&self) -> &'static str {
        STAGE_NAME
    }

    fn apply(&self, value: &ModelResponse) -> Result<ModelResponse, GatewayError> {
        debug!(output = %value.output, "Validating YAML");
        serde_yaml::from_str::<serde_yaml::Value>(&value.output).map_err(|e| {
            GatewayError::filter_rejection(
                STAGE_NAME,
                format!("response output is not valid YAML: {e}"),
            )
        })?;
        Ok(value.clone())
    }
}
