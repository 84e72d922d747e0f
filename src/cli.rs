//! CLI argument definitions using clap.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use gateway_telemetry::LoggingConfig;

use crate::commands;

/// LLM Inference Router - route prompts to IBM, OpenAI and HuggingFace models
#[derive(Parser, Debug)]
#[command(name = "llm-router")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log level
    #[arg(long, value_enum, default_value_t = Verbosity::Info, env = "ROUTER_LOG_LEVEL", global = true)]
    pub verbosity: Verbosity,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Log level names accepted by `--verbosity`
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verbosity {
    /// Everything, including per-request payload dumps
    Trace,
    /// Debug
    Debug,
    /// Lifecycle events and requests
    Info,
    /// Warn
    Warn,
    /// Failures only
    Error,
}

impl Verbosity {
    fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    #[command(visible_alias = "start")]
    Serve(commands::serve::ServeArgs),

    /// Run a single inference and print the output
    Infer(commands::infer::InferArgs),

    /// Validate a configuration file
    Validate(commands::validate::ValidateArgs),
}

impl Cli {
    /// Logging setup selected by the global flags
    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::new()
            .with_level(self.verbosity.as_directive())
            .with_json(self.json_logs)
            .with_target(matches!(self.verbosity, Verbosity::Trace | Verbosity::Debug))
    }

    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve(args) => commands::serve::execute(args).await,
            Commands::Infer(args) => commands::infer::execute(args).await,
            Commands::Validate(args) => commands::validate::execute(args).await,
        }
    }
}
