//! Configuration loading.
//!
//! Reads the YAML file, resolves `env:VAR` secret references and applies
//! `ROUTER_*` environment overrides.

use crate::{ConfigError, GatewayConfig};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use tracing::{debug, info};

/// Prefix marking a secret that must be read from the environment
pub const ENV_SECRET_PREFIX: &str = "env:";

/// Environment variables that override file values
pub const ENV_HOST: &str = "ROUTER_HOST";
/// Bind port override
pub const ENV_PORT: &str = "ROUTER_PORT";
/// Default provider override
pub const ENV_DEFAULT_PROVIDER: &str = "ROUTER_DEFAULT_PROVIDER";
/// Default model override
pub const ENV_DEFAULT_MODEL: &str = "ROUTER_DEFAULT_MODEL";

/// Builder-style loader
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    skip_env: bool,
}

impl ConfigLoader {
    /// Create a loader with no file set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file to read
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Do not consult the process environment
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Read, resolve and validate the configuration
    pub async fn load(self) -> Result<GatewayConfig, ConfigError> {
        let path = self
            .file
            .clone()
            .ok_or_else(|| ConfigError::Invalid("no configuration file given".to_string()))?;

        let yaml = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;

        debug!(path = %path.display(), "Read configuration file");
        let config = self.load_from_str(&yaml)?;

        info!(
            path = %path.display(),
            models = config.models.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parse and resolve a YAML document
    pub fn load_from_str(&self, yaml: &str) -> Result<GatewayConfig, ConfigError> {
        let mut config = GatewayConfig::from_yaml(yaml)?;
        if self.skip_env {
            resolve_secrets(&mut config, |_| None)?;
        } else {
            let lookup = |name: &str| std::env::var(name).ok();
            apply_env_overrides(&mut config, lookup)?;
            resolve_secrets(&mut config, lookup)?;
        }
        Ok(config)
    }
}

/// Load the configuration at `path` using the process environment
pub async fn load_config(path: impl Into<PathBuf>) -> Result<GatewayConfig, ConfigError> {
    ConfigLoader::new().with_file(path).load().await
}

/// Apply `ROUTER_*` overrides using `lookup` to read variables
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup(ENV_HOST) {
        config.server_config.host = host;
    }
    if let Some(port) = lookup(ENV_PORT) {
        let port = port
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("{ENV_PORT}={port} is not a port: {e}")))?;
        config.server_config.port = Some(port);
    }
    if let Some(provider) = lookup(ENV_DEFAULT_PROVIDER) {
        config.default_provider = provider;
    }
    if let Some(model) = lookup(ENV_DEFAULT_MODEL) {
        config.default_model_id = model;
    }
    Ok(())
}

/// Replace every `env:VAR` secret with the variable's value
pub fn resolve_secrets<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for model in &mut config.models {
        resolve_optional(&mut model.api_key, &lookup)?;
    }

    let server = &mut config.server_config;
    resolve_optional(&mut server.client_secret, &lookup)?;
    resolve_optional(&mut server.session_auth_key, &lookup)?;
    resolve_optional(&mut server.token_encryption_key, &lookup)?;
    for token in &mut server.bearer_tokens {
        *token = resolve(token, &lookup)?;
    }
    Ok(())
}

fn resolve_optional<F>(secret: &mut Option<SecretString>, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = secret.as_ref() {
        *secret = Some(resolve(value, lookup)?);
    }
    Ok(())
}

fn resolve<F>(secret: &SecretString, lookup: &F) -> Result<SecretString, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match secret.expose_secret().strip_prefix(ENV_SECRET_PREFIX) {
        Some(name) => lookup(name)
            .map(SecretString::new)
            .ok_or_else(|| ConfigError::MissingEnv(name.to_string())),
        None => Ok(secret.clone()),
    }
}
