//! Custom Axum extractors.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;

/// Request id from `x-request-id` (set by the request-id layer) or a fresh UUID
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

        Ok(Self(id))
    }
}

/// JSON body extractor that rejects with a 400 [`ApiError`].
///
/// The body is decoded whatever its `Content-Type`.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            ApiError::bad_request(format!(
                "Invalid request payload: {}",
                rejection.body_text()
            ))
        })?;

        serde_json::from_slice(&bytes).map(Self).map_err(|e| {
            debug!(error = %e, "Rejected request payload");
            ApiError::bad_request(format!("Invalid request payload: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode};
    use gateway_core::ModelInput;

    #[tokio::test]
    async fn test_request_id_from_header() {
        let request = Request::builder()
            .header("x-request-id", "req-123")
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let RequestId(id) = RequestId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(id, "req-123");
    }

    #[tokio::test]
    async fn test_request_id_generated() {
        let request = Request::builder().body(Body::empty()).unwrap();
        let (mut parts, _) = request.into_parts();
        let RequestId(id) = RequestId::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }

    #[tokio::test]
    async fn test_json_body_rejects_malformed_json() {
        let request = Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let err = JsonBody::<ModelInput>::from_request(request, &())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.starts_with("Invalid request payload"));
    }

    #[tokio::test]
    async fn test_json_body_ignores_missing_content_type() {
        let request = Request::builder()
            .body(Body::from(r#"{"prompt":"list pods"}"#))
            .unwrap();
        let JsonBody(input) = JsonBody::<ModelInput>::from_request(request, &())
            .await
            .unwrap();
        assert_eq!(input.prompt, "list pods");
    }

    #[tokio::test]
    async fn test_json_body_accepts_model_input() {
        let request = Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"prompt":"list pods","provider":"openai"}"#))
            .unwrap();
        let JsonBody(input) = JsonBody::<ModelInput>::from_request(request, &())
            .await
            .unwrap();
        assert_eq!(input.prompt, "list pods");
    }
}
