//! # Bearer Authentication
//!
//! Every inference request carries `Authorization: Bearer <token>`. Two
//! independent checks may be configured:
//!
//! - **JWT**: an HS256 token signed with `tokenEncryptionKey`, whose
//!   `username` claim must be on the allow-list
//! - **Static tokens**: a token equal to one of `bearerTokens`
//!
//! A request passes only when exactly one configured check accepts the
//! token. With no check configured every request is rejected.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use gateway_config::{ConfigError, ServerConfig};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{collections::HashSet, sync::Arc, time::Duration};
use tracing::{debug, warn};

use crate::state::AppState;

/// Claims carried by issued tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user
    pub username: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// HS256 signing and verification
#[derive(Clone)]
pub struct JwtConfig {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtConfig {
    /// Create from a raw shared secret
    pub fn from_secret(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Sign a token for `username`
    pub fn issue(&self, username: &str) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            username: username.to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify signature and expiry
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// JWT check (optional)
    pub jwt: Option<JwtConfig>,
    /// SHA-256 hex digests of accepted static tokens
    pub static_token_hashes: HashSet<String>,
    /// Users allowed to hold a JWT
    pub allowed_users: HashSet<String>,
}

impl AuthConfig {
    /// Create a builder
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }

    /// Build from the server section of the configuration file
    pub fn from_server_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let mut builder = Self::builder();

        if let Some(secret) = config.token_key()? {
            builder = builder.jwt(JwtConfig::from_secret(&secret, config.token_ttl));
        }
        for token in config.static_tokens() {
            builder = builder.static_token(token);
        }
        for (user, allowed) in &config.allowed_users {
            if *allowed {
                builder = builder.allow_user(user);
            }
        }

        Ok(builder.build())
    }

    /// Whether no check is configured
    pub fn is_disabled(&self) -> bool {
        self.jwt.is_none() && self.static_token_hashes.is_empty()
    }

    /// Whether `username` may hold a JWT
    pub fn is_user_allowed(&self, username: &str) -> bool {
        self.allowed_users.contains(username)
    }
}

/// Builder for [`AuthConfig`]
#[derive(Debug, Default)]
pub struct AuthConfigBuilder {
    config: AuthConfig,
}

impl AuthConfigBuilder {
    /// Enable the JWT check
    #[must_use]
    pub fn jwt(mut self, jwt: JwtConfig) -> Self {
        self.config.jwt = Some(jwt);
        self
    }

    /// Accept a static token
    #[must_use]
    pub fn static_token(mut self, token: &str) -> Self {
        self.config.static_token_hashes.insert(hash_token(token));
        self
    }

    /// Add a user to the allow-list
    #[must_use]
    pub fn allow_user(mut self, username: impl Into<String>) -> Self {
        self.config.allowed_users.insert(username.into());
        self
    }

    /// Build
    pub fn build(self) -> AuthConfig {
        self.config
    }
}

/// How a request was authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Issued JWT
    Jwt,
    /// Configured static token
    StaticToken,
}

/// Caller identity, inserted into request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Username from the JWT, or `static-token`
    pub username: String,
    /// Check that accepted the token
    pub method: AuthMethod,
}

/// Shared authentication state
#[derive(Debug, Clone)]
pub struct AuthState {
    config: Arc<AuthConfig>,
}

impl AuthState {
    /// Create from configuration
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Configuration
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Whether `username` may hold a JWT
    pub fn is_user_allowed(&self, username: &str) -> bool {
        self.config.is_user_allowed(username)
    }

    /// Sign a token for `username`
    pub fn issue_token(&self, username: &str) -> Result<String, AuthError> {
        match &self.config.jwt {
            Some(jwt) => jwt.issue(username),
            None => Err(AuthError::NotConfigured),
        }
    }

    /// Authenticate the `Authorization` header
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
        if !headers.contains_key(header::AUTHORIZATION) {
            return Err(AuthError::MissingCredentials);
        }
        let bearer = headers
            .typed_get::<Authorization<Bearer>>()
            .ok_or(AuthError::MalformedHeader)?;

        self.authenticate_token(bearer.token())
    }

    /// Run every configured check against `token`
    pub fn authenticate_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let mut accepted = Vec::new();
        let mut rejection = None;

        if let Some(jwt) = &self.config.jwt {
            match jwt.validate(token) {
                Ok(claims) if self.config.is_user_allowed(&claims.username) => {
                    accepted.push(AuthenticatedUser {
                        username: claims.username,
                        method: AuthMethod::Jwt,
                    });
                }
                Ok(claims) => rejection = Some(AuthError::UserNotAllowed(claims.username)),
                Err(e) => rejection = Some(e),
            }
        }

        if !self.config.static_token_hashes.is_empty() {
            if self.config.static_token_hashes.contains(&hash_token(token)) {
                accepted.push(AuthenticatedUser {
                    username: "static-token".to_string(),
                    method: AuthMethod::StaticToken,
                });
            } else {
                rejection.get_or_insert(AuthError::InvalidToken(
                    "token does not match any configured token".to_string(),
                ));
            }
        }

        match accepted.len() {
            1 => accepted.pop().ok_or(AuthError::NotConfigured),
            0 => Err(rejection.unwrap_or(AuthError::NotConfigured)),
            _ => Err(AuthError::AmbiguousCredential),
        }
    }
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Authentication error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header
    #[error("Authentication required")]
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    #[error("Authorization header must use the Bearer scheme")]
    MalformedHeader,

    /// Bad signature, unknown token or malformed claims
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// JWT past its expiry
    #[error("Token expired")]
    ExpiredToken,

    /// JWT valid but user not on the allow-list
    #[error("User '{0}' is not authorized")]
    UserNotAllowed(String),

    /// Token accepted by more than one check
    #[error("Token matched more than one authentication method")]
    AmbiguousCredential,

    /// No check configured
    #[error("No authentication method is configured")]
    NotConfigured,

    /// Token could not be signed
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Get error code for API response
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "authentication_required",
            Self::MalformedHeader => "malformed_header",
            Self::InvalidToken(_) => "invalid_token",
            Self::ExpiredToken => "expired_token",
            Self::UserNotAllowed(_) => "user_not_allowed",
            Self::AmbiguousCredential => "ambiguous_credential",
            Self::NotConfigured => "not_configured",
            Self::Signing(_) => "signing_error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": {
                "type": self.error_code(),
                "message": self.to_string(),
            }
        });

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Authentication middleware for the protected routes.
///
/// CORS preflight requests pass through unauthenticated.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.method() == axum::http::Method::OPTIONS {
        return next.run(request).await;
    }

    match state.auth.authenticate(request.headers()) {
        Ok(user) => {
            debug!(username = %user.username, method = ?user.method, "Request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) => {
            warn!(error = %err, path = %request.uri().path(), "Authentication failed");
            state.metrics.record_auth_failure(err.error_code());
            err.into_response()
        }
    }
}
