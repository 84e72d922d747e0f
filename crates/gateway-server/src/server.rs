//! HTTP(S) listener.

use axum_server::tls_rustls::RustlsConfig;
use gateway_config::ConfigError;
use gateway_telemetry::TelemetryError;
use std::{net::SocketAddr, path::PathBuf};
use tracing::{info, warn};

use crate::{
    routes::create_router,
    shutdown::{shutdown_signal, SHUTDOWN_GRACE},
    state::AppState,
};

/// Errors raised while building state or serving
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Telemetry could not be initialized
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// State could not be assembled
    #[error("setup error: {0}")]
    Setup(String),

    /// Bad listen address
    #[error("invalid listen address '{0}'")]
    Address(String),

    /// Socket or certificate I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Certificate and key, PEM encoded
#[derive(Debug, Clone)]
pub struct TlsFiles {
    /// Certificate chain
    pub cert: PathBuf,
    /// Private key
    pub key: PathBuf,
}

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// TLS files; plain HTTP when absent
    pub tls: Option<TlsFiles>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: gateway_config::schema::DEFAULT_PLAIN_PORT,
            tls: None,
        }
    }
}

impl ServerConfig {
    /// Default listener
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener matching the server section of the configuration file
    pub fn from_config(config: &gateway_config::ServerConfig) -> Self {
        let tls = config.tls_enabled().then(|| TlsFiles {
            cert: PathBuf::from(&config.tls_cert_file),
            key: PathBuf::from(&config.tls_key_file),
        });
        Self {
            host: config.host.clone(),
            port: config.port(),
            tls,
        }
    }

    /// Set host
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Serve over TLS
    #[must_use]
    pub fn with_tls(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.tls = Some(TlsFiles {
            cert: cert.into(),
            key: key.into(),
        });
        self
    }

    /// Socket address to bind
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ServerError::Address(addr))
    }
}

/// The router server
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Create a server
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Serve until a shutdown signal arrives
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.socket_addr()?;
        let app = create_router(self.state);

        match self.config.tls {
            Some(tls) => {
                let rustls = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
                let handle = axum_server::Handle::new();

                let shutdown = handle.clone();
                tokio::spawn(async move {
                    shutdown_signal().await;
                    shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
                });

                info!(%addr, "Listening with TLS");
                axum_server::bind_rustls(addr, rustls)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await?;
            }
            None => {
                warn!(%addr, "TLS is not configured; serving plain HTTP");
                let listener = tokio::net::TcpListener::bind(addr).await?;
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        shutdown_signal().await;
                    })
                    .await?;
            }
        }

        info!("Server stopped");
        Ok(())
    }
}
