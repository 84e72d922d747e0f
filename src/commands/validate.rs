//! Validate command - validate configuration files.

use anyhow::Result;
use clap::Args;
use gateway_config::ConfigLoader;
use std::path::PathBuf;

/// Arguments for the validate command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration file to validate
    #[arg(short, long, default_value = "router.yaml")]
    pub config: PathBuf,

    /// Also require the checks `serve` applies
    #[arg(long)]
    pub strict: bool,
}

/// Execute the validate command.
pub async fn execute(args: ValidateArgs) -> Result<()> {
    let config = ConfigLoader::new()
        .with_file(&args.config)
        .load()
        .await?;

    let warnings = if args.strict {
        config.validate_for_serve()?
    } else {
        config.validate()?
    };

    println!("Configuration {} is valid", args.config.display());
    println!("  models: {}", config.models.len());
    for model in &config.models {
        println!("    - {}", model.key());
    }
    println!(
        "  default: {}/{}",
        config.default_provider, config.default_model_id
    );
    for warning in &warnings {
        println!("  warning: {warning}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_validate_good_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "models:\n  - provider: huggingface\n    modelId: bigcode/starcoder\nserverConfig:\n  bearerTokens: [t]"
        )
        .unwrap();

        let result = execute(ValidateArgs {
            config: file.path().to_path_buf(),
            strict: true,
        })
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_strict_requires_authorization() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "models:\n  - provider: openai\n    modelId: gpt-4").unwrap();

        let args = |strict| ValidateArgs {
            config: file.path().to_path_buf(),
            strict,
        };
        assert!(execute(args(false)).await.is_ok());
        assert!(execute(args(true)).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_provider_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "models:\n  - provider: cohere\n    modelId: command").unwrap();

        assert!(execute(ValidateArgs {
            config: file.path().to_path_buf(),
            strict: false,
        })
        .await
        .is_err());
    }
}
