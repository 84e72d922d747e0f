//! Configuration schema.

use crate::ConfigError;
use base64::{engine::general_purpose::STANDARD, Engine};
use gateway_core::{ProviderKey, ProviderType};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Port used when TLS is configured and no port is set
pub const DEFAULT_TLS_PORT: u16 = 8443;
/// Port used for plain HTTP when no port is set
pub const DEFAULT_PLAIN_PORT: u16 = 8080;
/// Minimum decoded length of the session cookie signing key
pub const MIN_SESSION_KEY_LEN: usize = 64;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Backend models to register
    #[serde(default)]
    pub models: Vec<ModelConfig>,

    /// Provider used when a request leaves `provider` empty
    #[serde(default)]
    pub default_provider: String,

    /// Model used when a request leaves `modelId` empty
    #[serde(default)]
    pub default_model_id: String,

    /// Listener and authorization settings
    #[serde(default)]
    pub server_config: ServerConfig,
}

/// One registered backend model
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// Provider kind (`ibm`, `openai`, `huggingface`)
    pub provider: String,

    /// Model identifier sent upstream
    pub model_id: String,

    /// Base URL, empty for the provider's public endpoint
    #[serde(default)]
    pub url: String,

    /// Default caller identity (IBM e-mail)
    #[serde(default)]
    pub user_id: String,

    /// Default credential
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Per-model upstream deadline, overrides `serverConfig.upstreamTimeout`
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl ModelConfig {
    /// Registry key for this model
    pub fn key(&self) -> ProviderKey {
        ProviderKey::new(&self.provider, &self.model_id)
    }

    /// Default credential, `None` when absent or blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret().as_str())
            .filter(|k| !k.is_empty())
    }
}

/// Listener, TLS, OAuth and bearer-token settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port, defaults depend on whether TLS is enabled
    #[serde(default)]
    pub port: Option<u16>,

    /// PEM certificate chain
    #[serde(default)]
    pub tls_cert_file: String,

    /// PEM private key
    #[serde(default)]
    pub tls_key_file: String,

    /// OAuth client id
    #[serde(default)]
    pub client_id: String,

    /// OAuth client secret
    #[serde(default)]
    pub client_secret: Option<SecretString>,

    /// OAuth redirect URL registered with the identity provider
    #[serde(default)]
    pub redirect_url: String,

    /// Identity provider authorize endpoint
    #[serde(default = "default_authorize_url")]
    pub oauth_authorize_url: String,

    /// Identity provider token endpoint
    #[serde(default = "default_token_url")]
    pub oauth_token_url: String,

    /// Identity provider user profile endpoint
    #[serde(default = "default_user_url")]
    pub oauth_user_url: String,

    /// Base64 key signing the session cookie
    #[serde(default)]
    pub session_auth_key: Option<SecretString>,

    /// Lifetime of a login session
    #[serde(default = "default_session_ttl", with = "humantime_serde")]
    pub session_ttl: Duration,

    /// Base64 HS256 key for issued and accepted bearer tokens
    #[serde(default)]
    pub token_encryption_key: Option<SecretString>,

    /// Lifetime of issued bearer tokens
    #[serde(default = "default_token_ttl", with = "humantime_serde")]
    pub token_ttl: Duration,

    /// Default upstream deadline
    #[serde(default = "default_upstream_timeout", with = "humantime_serde")]
    pub upstream_timeout: Duration,

    /// Users allowed to obtain and present signed tokens
    #[serde(default)]
    pub allowed_users: HashMap<String, bool>,

    /// Static bearer tokens accepted verbatim
    #[serde(default)]
    pub bearer_tokens: Vec<SecretString>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_authorize_url() -> String {
    "https://github.com/login/oauth/authorize".to_string()
}

fn default_token_url() -> String {
    "https://github.com/login/oauth/access_token".to_string()
}

fn default_user_url() -> String {
    "https://api.github.com/user".to_string()
}

const fn default_session_ttl() -> Duration {
    Duration::from_secs(12 * 60 * 60)
}

const fn default_token_ttl() -> Duration {
    Duration::from_secs(30 * 24 * 60 * 60)
}

const fn default_upstream_timeout() -> Duration {
    Duration::from_secs(60)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
            tls_cert_file: String::new(),
            tls_key_file: String::new(),
            client_id: String::new(),
            client_secret: None,
            redirect_url: String::new(),
            oauth_authorize_url: default_authorize_url(),
            oauth_token_url: default_token_url(),
            oauth_user_url: default_user_url(),
            session_auth_key: None,
            session_ttl: default_session_ttl(),
            token_encryption_key: None,
            token_ttl: default_token_ttl(),
            upstream_timeout: default_upstream_timeout(),
            allowed_users: HashMap::new(),
            bearer_tokens: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Whether both a certificate and a key are configured
    pub fn tls_enabled(&self) -> bool {
        !self.tls_cert_file.is_empty() && !self.tls_key_file.is_empty()
    }

    /// Effective bind port
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(if self.tls_enabled() {
            DEFAULT_TLS_PORT
        } else {
            DEFAULT_PLAIN_PORT
        })
    }

    /// Whether `username` is on the allow-list
    pub fn is_user_allowed(&self, username: &str) -> bool {
        self.allowed_users.get(username).copied().unwrap_or(false)
    }

    /// Whether the OAuth login flow has everything it needs
    pub fn oauth_enabled(&self) -> bool {
        !self.client_id.is_empty()
            && self.client_secret.is_some()
            && self.session_auth_key.is_some()
            && self.token_encryption_key.is_some()
    }

    /// Decoded HS256 signing key
    pub fn token_key(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        decode_key("tokenEncryptionKey", self.token_encryption_key.as_ref())
    }

    /// Decoded session cookie signing key
    pub fn session_key(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let key = decode_key("sessionAuthKey", self.session_auth_key.as_ref())?;
        if let Some(bytes) = &key {
            if bytes.len() < MIN_SESSION_KEY_LEN {
                return Err(ConfigError::Invalid(format!(
                    "sessionAuthKey must decode to at least {MIN_SESSION_KEY_LEN} bytes, got {}",
                    bytes.len()
                )));
            }
        }
        Ok(key)
    }

    /// Non-empty static bearer tokens
    pub fn static_tokens(&self) -> impl Iterator<Item = &str> {
        self.bearer_tokens
            .iter()
            .map(|t| t.expose_secret().as_str())
            .filter(|t| !t.is_empty())
    }
}

fn decode_key(name: &str, value: Option<&SecretString>) -> Result<Option<Vec<u8>>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let bytes = STANDARD
        .decode(value.expose_secret().trim())
        .map_err(|e| ConfigError::Invalid(format!("{name} is not valid base64: {e}")))?;
    if bytes.is_empty() {
        return Err(ConfigError::Invalid(format!("{name} is empty")));
    }
    Ok(Some(bytes))
}

impl GatewayConfig {
    /// Parse a YAML document without resolving secrets or env overrides
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Check the configuration, returning non-fatal warnings
    pub fn validate(&self) -> Result<Vec<String>, ConfigError> {
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();

        for model in &self.models {
            model
                .provider
                .parse::<ProviderType>()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;

            if model.model_id.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "model entry for provider '{}' has an empty modelId",
                    model.provider
                )));
            }

            if !model.url.is_empty() {
                url::Url::parse(&model.url).map_err(|e| {
                    ConfigError::Invalid(format!("invalid url '{}' for {}: {e}", model.url, model.key()))
                })?;
            }

            if !seen.insert(model.key()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate model entry {}",
                    model.key()
                )));
            }
        }

        if self.models.is_empty() {
            warnings.push("no models configured".to_string());
        }

        let default_key = ProviderKey::new(&self.default_provider, &self.default_model_id);
        if !seen.contains(&default_key) {
            warnings.push(format!("default model {default_key} is not in the model list"));
        }

        let server = &self.server_config;
        if server.tls_cert_file.is_empty() != server.tls_key_file.is_empty() {
            return Err(ConfigError::Invalid(
                "tlsCertFile and tlsKeyFile must be set together".to_string(),
            ));
        }

        server.token_key()?;
        server.session_key()?;

        if !server.client_id.is_empty() && !server.oauth_enabled() {
            return Err(ConfigError::Invalid(
                "OAuth login requires clientSecret, sessionAuthKey and tokenEncryptionKey".to_string(),
            ));
        }

        if server.token_encryption_key.is_some() && !server.allowed_users.values().any(|v| *v) {
            warnings.push("tokenEncryptionKey is set but allowedUsers is empty".to_string());
        }

        Ok(warnings)
    }

    /// Additional checks before serving: at least one bearer path must exist
    pub fn validate_for_serve(&self) -> Result<Vec<String>, ConfigError> {
        let warnings = self.validate()?;
        let server = &self.server_config;
        if server.token_encryption_key.is_none() && server.static_tokens().next().is_none() {
            return Err(ConfigError::Invalid(
                "no authorization configured: set tokenEncryptionKey or bearerTokens".to_string(),
            ));
        }
        Ok(warnings)
    }
}
