//! Serve command - run the HTTP API.

use anyhow::{Context, Result};
use clap::Args;
use gateway_server::{AppState, Server, ServerConfig};
use std::path::PathBuf;
use tracing::{info, warn};

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Configuration file
    #[arg(short, long, env = "ROUTER_CONFIG", default_value = "router.yaml")]
    pub config: PathBuf,
}

/// Execute the serve command.
pub async fn execute(args: ServeArgs) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting LLM Inference Router"
    );

    let config = gateway_config::load_config(&args.config)
        .await
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    for warning in config
        .validate_for_serve()
        .context("invalid configuration")?
    {
        warn!("{warning}");
    }

    let state = AppState::from_config(&config)?;
    let server_config = ServerConfig::from_config(&config.server_config);

    info!(
        host = %server_config.host,
        port = server_config.port,
        tls = server_config.tls.is_some(),
        models = state.providers.len(),
        "Configuration loaded"
    );

    Server::new(server_config, state).run().await?;
    Ok(())
}
