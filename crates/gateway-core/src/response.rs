//! Normalized response returned to callers.

use serde::{Deserialize, Serialize};

/// Normalized model response.
///
/// A value exists on every invocation path, including failures. `error_message`
/// is the in-band failure channel; the HTTP status carries the out-of-band one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Echo of the prompt that was sent upstream
    #[serde(rename = "input_tokens", default)]
    pub input_echo: String,

    /// Upstream status, when the backend reports one
    #[serde(default)]
    pub status: String,

    /// Upstream request or job identifier
    #[serde(rename = "requestId", default)]
    pub request_id: String,

    /// Conversation identifier copied from the request
    #[serde(rename = "conversationId", default)]
    pub conversation_id: String,

    /// Post-processed output
    #[serde(default)]
    pub output: String,

    /// Output as returned by the upstream, before filtering
    #[serde(rename = "raw_output", default)]
    pub raw_output: String,

    /// Failure description, empty on success
    #[serde(rename = "error", default)]
    pub error_message: String,
}

impl ModelResponse {
    /// Whether a failure has been recorded on this response
    pub fn is_error(&self) -> bool {
        !self.error_message.is_empty()
    }

    /// Replace the output, keeping everything else
    #[must_use]
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }
}
