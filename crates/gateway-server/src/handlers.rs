//! HTTP request handlers for the router API.

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use gateway_core::{invoke_model, ModelInput};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::{
    error::ApiError,
    extractors::{JsonBody, RequestId},
    state::AppState,
};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Version
    pub version: String,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.providers.is_empty() {
        (StatusCode::SERVICE_UNAVAILABLE, "no models registered")
    } else {
        (StatusCode::OK, "ready")
    }
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.gather(),
    )
}

/// `POST /infer`: route a prompt to one model and return its filtered output.
///
/// Filter, upstream and credential failures still carry the JSON model
/// response, with its `error` field set.
#[instrument(skip_all, fields(request_id = %request_id.0))]
pub async fn infer(
    State(state): State<AppState>,
    request_id: RequestId,
    JsonBody(mut input): JsonBody<ModelInput>,
) -> Result<Response, ApiError> {
    input.apply_defaults(&state.defaults.provider, &state.defaults.model_id);

    let provider = state
        .providers
        .get(&input.provider, &input.model_id)
        .map_err(|e| {
            warn!(error = %e, "Rejected request for unknown model");
            ApiError::from(e)
        })?;
    let key = provider.key().to_string();

    info!(provider = %key, "Invoking model");
    let started = Instant::now();

    match invoke_model(input, provider.as_ref()).await {
        Ok(response) => {
            state
                .metrics
                .record_inference(&key, "success", started.elapsed());
            Ok((StatusCode::OK, Json(response)).into_response())
        }
        Err(err) => {
            let status = err.error().status_code();
            state
                .metrics
                .record_inference(&key, err.error().error_type(), started.elapsed());
            error!(
                provider = %key,
                stage = ?err.stage(),
                soft = err.is_soft(),
                error = %err.error(),
                "Invocation failed"
            );
            Ok((status, Json(err.into_response())).into_response())
        }
    }
}

/// CORS preflight for `/infer`
pub async fn preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    response
}

/// User feedback on a model response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Feedback {
    /// Request the feedback refers to
    pub request_id: String,
    /// Conversation the request belonged to
    pub conversation_id: String,
    /// Output shown to the user
    pub response: String,
    /// Whether the user kept the output
    pub response_accepted: bool,
    /// User-corrected output
    pub corrected_response: String,
    /// Free-form comment
    pub user_comments: String,
}

/// `POST /feedback`: accept and log user feedback
pub async fn feedback(JsonBody(feedback): JsonBody<Feedback>) -> impl IntoResponse {
    info!(
        request_id = %feedback.request_id,
        conversation_id = %feedback.conversation_id,
        accepted = feedback.response_accepted,
        corrected = !feedback.corrected_response.is_empty(),
        comments = %feedback.user_comments,
        "Feedback received"
    );
    (StatusCode::OK, "Feedback received.")
}
