//! OAuth authorization-code login used to mint bearer tokens.
//!
//! `/login` redirects to the identity provider, `/githubcallback` completes
//! the exchange and opens a session, `/apitoken` turns a session for an
//! allowed user into a signed JWT.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use gateway_config::ServerConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::ApiError,
    session::{LoginStates, SessionStore, SESSION_COOKIE},
    state::AppState,
};

const LOGIN_STATE_TTL: Duration = Duration::from_secs(10 * 60);
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("llm-inference-router/", env!("CARGO_PKG_VERSION"));

/// Identity provider endpoints and client credentials
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth application client id
    pub client_id: String,
    /// OAuth application client secret
    pub client_secret: SecretString,
    /// Callback URL registered with the provider
    pub redirect_url: String,
    /// Authorization endpoint
    pub authorize_url: String,
    /// Code exchange endpoint
    pub token_url: String,
    /// User profile endpoint
    pub user_url: String,
    /// Requested scope
    pub scope: String,
}

impl OAuthConfig {
    /// Extract the login settings, if the login flow is fully configured
    pub fn from_server_config(config: &ServerConfig) -> Option<Self> {
        if !config.oauth_enabled() {
            return None;
        }
        Some(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone()?,
            redirect_url: config.redirect_url.clone(),
            authorize_url: config.oauth_authorize_url.clone(),
            token_url: config.oauth_token_url.clone(),
            user_url: config.oauth_user_url.clone(),
            scope: "user:email".to_string(),
        })
    }
}

/// OAuth failures surfaced by the login endpoints
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Unknown, reused or expired `state`
    #[error("Invalid OAuth state")]
    InvalidState,

    /// Provider redirected back with an error
    #[error("Authorization denied: {0}")]
    Denied(String),

    /// Callback without a `code`
    #[error("Missing authorization code")]
    MissingCode,

    /// Code exchange failed
    #[error("Failed to exchange token: {0}")]
    Exchange(String),

    /// Profile lookup failed
    #[error("Failed to get user info: {0}")]
    Profile(String),

    /// Bad endpoint or client setup
    #[error("OAuth configuration error: {0}")]
    Configuration(String),
}

impl OAuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidState | Self::Denied(_) | Self::MissingCode => StatusCode::BAD_REQUEST,
            Self::Exchange(_) | Self::Profile(_) | Self::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        warn!(error = %self, "OAuth login failed");
        (self.status_code(), self.to_string()).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserProfile {
    login: String,
}

/// OAuth client plus the login state it owns
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
    sessions: SessionStore,
    logins: LoginStates,
}

impl OAuthClient {
    /// Create a client whose sessions live for `session_ttl`
    pub fn new(config: OAuthConfig, session_ttl: Duration) -> Result<Self, OAuthError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| OAuthError::Configuration(e.to_string()))?;

        Ok(Self {
            config,
            http,
            sessions: SessionStore::new(session_ttl),
            logins: LoginStates::new(LOGIN_STATE_TTL),
        })
    }

    /// Session store
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Pending login states
    pub fn logins(&self) -> &LoginStates {
        &self.logins
    }

    /// Authorization URL carrying `state`
    pub fn authorize_url(&self, state: &str) -> Result<String, OAuthError> {
        let mut url = Url::parse(&self.config.authorize_url)
            .map_err(|e| OAuthError::Configuration(format!("Invalid authorization URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("scope", &self.config.scope)
            .append_pair("state", state);

        Ok(url.to_string())
    }

    /// Exchange an authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret().as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_url.as_str()),
        ];

        debug!("Exchanging authorization code for token");

        let response = self
            .http
            .post(&self.config.token_url)
            .header(header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| OAuthError::Exchange(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthError::Exchange(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::Exchange(e.to_string()))?;

        match (tokens.access_token, tokens.error) {
            (Some(token), _) if !token.is_empty() => Ok(token),
            (_, Some(error)) => Err(OAuthError::Exchange(
                tokens.error_description.unwrap_or(error),
            )),
            _ => Err(OAuthError::Exchange("no access token in response".to_string())),
        }
    }

    /// Look up the login name behind an access token
    pub async fn fetch_username(&self, access_token: &str) -> Result<String, OAuthError> {
        let response = self
            .http
            .get(&self.config.user_url)
            .bearer_auth(access_token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| OAuthError::Profile(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthError::Profile(format!(
                "user endpoint returned {}",
                response.status()
            )));
        }

        let profile: UserProfile = response
            .json()
            .await
            .map_err(|e| OAuthError::Profile(e.to_string()))?;

        if profile.login.is_empty() {
            return Err(OAuthError::Profile("empty login".to_string()));
        }
        Ok(profile.login)
    }
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// `GET /login`
pub async fn login(State(state): State<AppState>) -> Result<Response, ApiError> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| ApiError::not_found("login is not configured"))?;

    let login_state = oauth.logins().begin();
    let url = oauth
        .authorize_url(&login_state)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(found(&url))
}

/// Query string of the provider redirect
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// `GET /githubcallback`
pub async fn callback(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<Response, OAuthError> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| OAuthError::Configuration("login is not configured".to_string()))?;

    if let Some(error) = params.error {
        return Err(OAuthError::Denied(error));
    }
    let login_state = params.state.unwrap_or_default();
    if !oauth.logins().complete(&login_state) {
        return Err(OAuthError::InvalidState);
    }
    let code = params.code.filter(|c| !c.is_empty()).ok_or(OAuthError::MissingCode)?;

    let access_token = oauth.exchange_code(&code).await?;
    let username = oauth.fetch_username(&access_token).await?;
    info!(username = %username, "User logged in");

    let session_id = oauth.sessions().create(&username);
    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((jar.add(cookie), Redirect::to("/apitoken")).into_response())
}

/// `GET /apitoken`
pub async fn api_token(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Response, ApiError> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| ApiError::not_found("login is not configured"))?;

    let session_id = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_string());
    let session = session_id
        .as_deref()
        .and_then(|id| oauth.sessions().get(id));
    let (Some(session_id), Some(session)) = (session_id, session) else {
        return Ok(found("/login"));
    };

    if !state.auth.is_user_allowed(&session.username) {
        warn!(username = %session.username, "Token requested by user outside the allow-list");
        state.metrics.record_auth_failure("user_not_allowed");
        oauth.sessions().remove(&session_id);
        let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
        return Ok((StatusCode::UNAUTHORIZED, jar, "User is not authorized").into_response());
    }

    let token = state
        .auth
        .issue_token(&session.username)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    state.metrics.record_token_issued("oauth");
    info!(username = %session.username, "Issued API token");

    Ok(Json(serde_json::json!({ "token": token })).into_response())
}
