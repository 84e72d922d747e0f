//! End-to-end tests for the router HTTP API.
//!
//! Requests go through the full router (authentication, routing, filter
//! chain) with `tower::ServiceExt::oneshot`. Upstream model APIs and the
//! OAuth identity provider are served by wiremock.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use gateway_config::GatewayConfig;
use gateway_core::{
    Filter, GatewayError, LLMProvider, ModelInput, ModelResponse, ProviderType,
};
use gateway_providers::{IbmConfig, IbmProvider, OpenAIConfig, OpenAIProvider, ProviderRegistry};
use gateway_server::{
    create_router, AppState, AuthConfig, AuthState, JwtConfig, OAuthClient, OAuthConfig,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STATIC_TOKEN: &str = "static-test-token";
const JWT_SECRET: &[u8] = b"jwt-secret-for-end-to-end-tests";

/// Provider that records how often it was called
struct SpyProvider {
    model_id: String,
    filter: Filter,
    calls: Arc<AtomicUsize>,
}

impl SpyProvider {
    fn new(model_id: &str) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Self {
            model_id: model_id.to_string(),
            filter: Filter::new(),
            calls: calls.clone(),
        };
        (provider, calls)
    }
}

#[async_trait]
impl LLMProvider for SpyProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn filter(&self) -> &Filter {
        &self.filter
    }

    async fn invoke(&self, input: &ModelInput) -> Result<ModelResponse, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ModelResponse {
            input_echo: input.prompt.clone(),
            request_id: "spy-1".to_string(),
            conversation_id: input.conversation_id.clone(),
            output: format!("echo: {}", input.prompt),
            raw_output: format!("echo: {}", input.prompt),
            ..Default::default()
        })
    }
}

fn static_auth() -> AuthState {
    AuthState::new(AuthConfig::builder().static_token(STATIC_TOKEN).build())
}

fn spy_state() -> (AppState, Arc<AtomicUsize>) {
    let (spy, calls) = SpyProvider::new("gpt-4");
    let state = AppState::builder()
        .providers(ProviderRegistry::new().with_provider(Arc::new(spy)))
        .defaults("openai", "gpt-4")
        .auth(static_auth())
        .build()
        .unwrap();
    (state, calls)
}

fn infer_request(token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/infer")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = create_router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body.to_vec())
}

fn json_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[cfg(test)]
mod health_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoint_returns_ok() {
        let (state, _) = spy_state();
        let (status, _, body) = send(state, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ready_with_models() {
        let (state, _) = spy_state();
        let (status, _, _) = send(state, get("/ready")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_not_ready_without_models() {
        let state = AppState::builder().build().unwrap();
        let (status, _, _) = send(state, get("/ready")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_metrics_record_inference() {
        let (state, _) = spy_state();
        let (status, _, _) = send(
            state.clone(),
            infer_request(Some(STATIC_TOKEN), &json!({"prompt": "list pods"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, headers, body) = send(state, get("/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains(
            "llm_router_inference_total{outcome=\"success\",provider=\"openai/gpt-4\"} 1"
        ));
    }
}

#[cfg(test)]
mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_never_reaches_provider() {
        let (state, calls) = spy_state();
        let (status, headers, body) =
            send(state, infer_request(None, &json!({"prompt": "list pods"}))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(headers[header::WWW_AUTHENTICATE], "Bearer");
        assert_eq!(json_body(&body)["error"]["type"], "authentication_required");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_token_never_reaches_provider() {
        let (state, calls) = spy_state();
        let (status, _, _) = send(
            state.clone(),
            infer_request(Some("wrong"), &json!({"prompt": "list pods"})),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let (_, _, metrics) = send(state, get("/metrics")).await;
        assert!(String::from_utf8(metrics)
            .unwrap()
            .contains("llm_router_auth_failures_total{reason=\"invalid_token\"} 1"));
    }

    #[tokio::test]
    async fn test_no_auth_configured_rejects_everything() {
        let (spy, calls) = SpyProvider::new("gpt-4");
        let state = AppState::builder()
            .providers(ProviderRegistry::new().with_provider(Arc::new(spy)))
            .build()
            .unwrap();

        let (status, _, _) = send(
            state,
            infer_request(
                Some("anything"),
                &json!({"provider": "openai", "modelId": "gpt-4", "prompt": "hi"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_jwt_for_allowed_user() {
        let jwt = JwtConfig::from_secret(JWT_SECRET, Duration::from_secs(600));
        let token = jwt.issue("alice").unwrap();
        let (spy, calls) = SpyProvider::new("gpt-4");
        let state = AppState::builder()
            .providers(ProviderRegistry::new().with_provider(Arc::new(spy)))
            .defaults("openai", "gpt-4")
            .auth(AuthState::new(
                AuthConfig::builder().jwt(jwt).allow_user("alice").build(),
            ))
            .build()
            .unwrap();

        let (status, _, _) =
            send(state, infer_request(Some(&token), &json!({"prompt": "hi"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_preflight_skips_authentication() {
        let (state, calls) = spy_state();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/infer")
            .body(Body::empty())
            .unwrap();

        let (status, headers, _) = send(state, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_feedback_requires_auth() {
        let (state, _) = spy_state();
        let request = |token: Option<&str>| {
            let mut builder = Request::builder()
                .method(Method::POST)
                .uri("/feedback")
                .header(header::CONTENT_TYPE, "application/json");
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            builder
                .body(Body::from(
                    json!({"requestId": "r-1", "responseAccepted": true}).to_string(),
                ))
                .unwrap()
        };

        let (status, _, _) = send(state.clone(), request(None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, body) = send(state, request(Some(STATIC_TOKEN))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"Feedback received.");
    }
}

#[cfg(test)]
mod inference_tests {
    use super::*;

    #[tokio::test]
    async fn test_infer_success() {
        let (state, calls) = spy_state();
        let body = json!({
            "provider": "openai",
            "modelId": "gpt-4",
            "prompt": "list pods",
            "conversationId": "conv-1"
        });

        let (status, _, body) = send(state, infer_request(Some(STATIC_TOKEN), &body)).await;
        assert_eq!(status, StatusCode::OK);

        let response = json_body(&body);
        assert_eq!(response["output"], "echo: list pods");
        assert_eq!(response["conversationId"], "conv-1");
        assert_eq!(response["error"], "");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prompt_request_alias() {
        let (state, calls) = spy_state();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/prompt_request")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {STATIC_TOKEN}"))
            .body(Body::from(json!({"prompt": "hi"}).to_string()))
            .unwrap();

        let (status, _, _) = send(state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_defaults_fill_blank_provider_and_model() {
        let (state, calls) = spy_state();
        let (status, _, _) = send(
            state,
            infer_request(
                Some(STATIC_TOKEN),
                &json!({"provider": "", "modelId": "", "prompt": "hi"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let (state, calls) = spy_state();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/infer")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {STATIC_TOKEN}"))
            .body(Body::from("{\"prompt\": "))
            .unwrap();

        let (status, _, _) = send(state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_body_without_content_type_is_decoded() {
        let (state, calls) = spy_state();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/infer")
            .header(header::AUTHORIZATION, format!("Bearer {STATIC_TOKEN}"))
            .body(Body::from(r#"{"prompt": "hi"}"#))
            .unwrap();

        let (status, _, body) = send(state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["output"], "echo: hi");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mixed_case_provider_from_config() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "kubectl get pods"}}]
            })))
            .expect(2)
            .mount(&mock)
            .await;

        let config = GatewayConfig::from_yaml(&format!(
            r"
defaultProvider: OpenAI
defaultModelId: gpt-4
models:
  - provider: OpenAI
    modelId: gpt-4
    url: {}
    apiKey: sk-config
serverConfig:
  bearerTokens: [{STATIC_TOKEN}]
",
            mock.uri()
        ))
        .unwrap();
        assert!(config.validate_for_serve().unwrap().is_empty());
        let state = AppState::from_config(&config).unwrap();

        let (status, _, body) = send(
            state.clone(),
            infer_request(Some(STATIC_TOKEN), &json!({"prompt": "list pods"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["output"], "kubectl get pods");

        let (status, _, _) = send(
            state,
            infer_request(
                Some(STATIC_TOKEN),
                &json!({"provider": "OPENAI", "modelId": "gpt-4", "prompt": "list pods"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_model_lists_valid_keys() {
        let (state, calls) = spy_state();
        let (status, _, body) = send(
            state,
            infer_request(
                Some(STATIC_TOKEN),
                &json!({"provider": "openai", "modelId": "gpt-5", "prompt": "hi"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error = json_body(&body);
        assert_eq!(error["error"]["type"], "model_not_found");
        assert!(error["error"]["message"]
            .as_str()
            .unwrap()
            .contains("openai/gpt-4"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    fn ibm_state(mock: &MockServer) -> AppState {
        let provider = IbmProvider::new(
            IbmConfig::new("granite")
                .with_base_url(mock.uri())
                .with_user_id("dev@example.com")
                .with_api_key("ibm-key"),
        )
        .unwrap();
        AppState::builder()
            .providers(ProviderRegistry::new().with_provider(Arc::new(provider)))
            .defaults("ibm", "granite")
            .auth(static_auth())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_ibm_yaml_is_extracted() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "job_id": "job-7",
                "status": "completed",
                "task_output": "Here you go:\n```yaml\nkind: Pod\nmetadata:\n  name: web\n```\n",
                "all_tokens": "raw"
            })))
            .expect(1)
            .mount(&mock)
            .await;

        let (status, _, body) = send(
            ibm_state(&mock),
            infer_request(Some(STATIC_TOKEN), &json!({"prompt": "a pod"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let response = json_body(&body);
        assert_eq!(response["output"], "kind: Pod\nmetadata:\n  name: web\n");
        assert_eq!(response["requestId"], "job-7");
    }

    #[tokio::test]
    async fn test_ibm_filter_rejection_keeps_output() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "job_id": "job-8",
                "task_output": "no code block here"
            })))
            .mount(&mock)
            .await;

        let (status, _, body) = send(
            ibm_state(&mock),
            infer_request(Some(STATIC_TOKEN), &json!({"prompt": "a pod"})),
        )
        .await;

        assert_eq!(status, StatusCode::EXPECTATION_FAILED);
        let response = json_body(&body);
        assert_eq!(response["output"], "no code block here");
        assert!(response["error"]
            .as_str()
            .unwrap()
            .contains("no fenced code block"));
    }

    fn openai_state(mock: &MockServer, api_key: Option<&str>) -> AppState {
        let mut config = OpenAIConfig::new("gpt-4").with_base_url(mock.uri());
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }
        let provider = OpenAIProvider::new(config).unwrap();
        AppState::builder()
            .providers(ProviderRegistry::new().with_provider(Arc::new(provider)))
            .defaults("openai", "gpt-4")
            .auth(static_auth())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock)
            .await;

        let (status, _, body) = send(
            openai_state(&mock, Some("sk-test")),
            infer_request(Some(STATIC_TOKEN), &json!({"prompt": "hi"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let response = json_body(&body);
        assert!(response["error"].as_str().unwrap().contains("500"));
        assert_eq!(response["input_tokens"], "hi");
    }

    #[tokio::test]
    async fn test_missing_credential_skips_upstream() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock)
            .await;

        let (status, _, body) = send(
            openai_state(&mock, None),
            infer_request(Some(STATIC_TOKEN), &json!({"prompt": "hi"})),
        )
        .await;

        assert_eq!(status, StatusCode::EXPECTATION_FAILED);
        assert!(json_body(&body)["error"]
            .as_str()
            .unwrap()
            .contains("required"));
    }

    #[tokio::test]
    async fn test_request_api_key_is_used() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(wiremock::matchers::header("authorization", "Bearer sk-from-request"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "kubectl get pods"}}]
            })))
            .expect(1)
            .mount(&mock)
            .await;

        let (status, _, body) = send(
            openai_state(&mock, None),
            infer_request(
                Some(STATIC_TOKEN),
                &json!({"prompt": "list pods", "apikey": "sk-from-request"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["output"], "kubectl get pods");
    }
}

#[cfg(test)]
mod oauth_tests {
    use super::*;
    use secrecy::SecretString;

    async fn identity_provider(login: &str) -> MockServer {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access_token": "gho_abc"})),
            )
            .mount(&mock)
            .await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": login})))
            .mount(&mock)
            .await;
        mock
    }

    fn oauth_state(mock: &MockServer) -> (AppState, Arc<AtomicUsize>) {
        let (spy, calls) = SpyProvider::new("gpt-4");
        let client = OAuthClient::new(
            OAuthConfig {
                client_id: "client-1".to_string(),
                client_secret: SecretString::new("shh".to_string()),
                redirect_url: "http://localhost/githubcallback".to_string(),
                authorize_url: format!("{}/login/oauth/authorize", mock.uri()),
                token_url: format!("{}/login/oauth/access_token", mock.uri()),
                user_url: format!("{}/user", mock.uri()),
                scope: "user:email".to_string(),
            },
            Duration::from_secs(600),
        )
        .unwrap();
        let jwt = JwtConfig::from_secret(JWT_SECRET, Duration::from_secs(600));

        let state = AppState::builder()
            .providers(ProviderRegistry::new().with_provider(Arc::new(spy)))
            .defaults("openai", "gpt-4")
            .auth(AuthState::new(
                AuthConfig::builder().jwt(jwt).allow_user("octocat").build(),
            ))
            .oauth(client)
            .build()
            .unwrap();
        (state, calls)
    }

    async fn login_and_get_cookie(state: &AppState) -> String {
        let (status, headers, _) = send(state.clone(), get("/login")).await;
        assert_eq!(status, StatusCode::FOUND);
        let location = url::Url::parse(headers[header::LOCATION].to_str().unwrap()).unwrap();
        let login_state = location
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap();

        let (status, headers, _) = send(
            state.clone(),
            get(&format!("/githubcallback?code=the-code&state={login_state}")),
        )
        .await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers[header::LOCATION], "/apitoken");

        let set_cookie = headers[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_full_login_flow_mints_usable_token() {
        let mock = identity_provider("octocat").await;
        let (state, calls) = oauth_state(&mock);
        let cookie = login_and_get_cookie(&state).await;

        let request = Request::builder()
            .uri("/apitoken")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(state.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
        let token = json_body(&body)["token"].as_str().unwrap().to_string();

        let (status, _, _) =
            send(state, infer_request(Some(&token), &json!({"prompt": "hi"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_apitoken_without_session_redirects_to_login() {
        let mock = identity_provider("octocat").await;
        let (state, _) = oauth_state(&mock);
        let (status, headers, _) = send(state, get("/apitoken")).await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(headers[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_apitoken_for_user_outside_allow_list() {
        let mock = identity_provider("mallory").await;
        let (state, _) = oauth_state(&mock);
        let cookie = login_and_get_cookie(&state).await;

        let request = Request::builder()
            .uri("/apitoken")
            .header(header::COOKIE, cookie.clone())
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(state.clone(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, b"User is not authorized");
        assert!(headers.contains_key(header::SET_COOKIE));

        // the session is gone, so the same cookie now starts a new login
        let request = Request::builder()
            .uri("/apitoken")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = send(state, request).await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(headers[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_callback_rejects_unknown_state() {
        let mock = identity_provider("octocat").await;
        let (state, _) = oauth_state(&mock);
        let (status, _, _) = send(state, get("/githubcallback?code=c&state=forged")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_not_configured() {
        let (state, _) = spy_state();
        let (status, _, _) = send(state, get("/login")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
