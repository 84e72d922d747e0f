//! # LLM Inference Router
//!
//! Routes prompts to IBM, OpenAI and HuggingFace model backends behind bearer
//! authentication.
//!
//! ## Usage
//!
//! ```bash
//! # Serve the HTTP API
//! llm-router serve --config router.yaml
//!
//! # One-off inference against the default model
//! llm-router infer --config router.yaml --inference "list all pods"
//!
//! # Check a configuration file
//! llm-router validate --config router.yaml
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(e) = gateway_telemetry::init_logging(&cli.logging_config()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    cli.execute().await
}
