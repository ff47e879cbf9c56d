//! recipe-forge CLI Binary
//!
//! Command-line interface for costed recipe generation.

use anyhow::Context;
use clap::Parser;
use recipe_forge::cli::{map_error, Cli, RunContext};
use recipe_forge::config::ConfigLoader;
use recipe_forge::logging::{init_logging, LoggingConfig};
use std::process;
use tokio::runtime::Runtime;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Logging comes up before anything else can fail
    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("recipe-forge CLI starting");

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{:#}", e);
            process::exit(1);
        }
    };

    let context = match RunContext::new(
        cli.workspace.clone(),
        cli.config.clone(),
        cli.user_id.clone(),
    ) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error loading configuration: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    };

    match runtime.block_on(context.execute(&cli.command)) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}

fn build_runtime() -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("recipe-forge")
        .build()
        .context("Failed to start async runtime")
}

/// Build logging configuration from CLI args and config files.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut loader = ConfigLoader::new().workspace_root(cli.workspace.clone());
    if let Some(ref config_path) = cli.config {
        loader = loader.explicit_file(config_path.clone());
    }
    let mut config = loader.load().map(|c| c.logging).unwrap_or_default();

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.format = format;
    }
    if let Some(output) = cli.log_output {
        config.output = output;
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_forge::logging::{LogFormat, LogOutput};

    #[test]
    fn test_build_logging_config_default() {
        let temp = tempfile::tempdir().unwrap();
        let ws = temp.path().to_string_lossy();
        let cli =
            Cli::try_parse_from(["recipe-forge", "--workspace", ws.as_ref(), "config", "show"])
                .unwrap();
        let config = build_logging_config(&cli);
        assert_eq!(config.output, LogOutput::Stderr, "default output keeps stdout clean");
        assert_eq!(config.format, LogFormat::Text);
    }

    #[test]
    fn test_build_logging_config_verbose() {
        let temp = tempfile::tempdir().unwrap();
        let ws = temp.path().to_string_lossy();
        let cli = Cli::try_parse_from([
            "recipe-forge",
            "--workspace",
            ws.as_ref(),
            "--verbose",
            "config",
            "show",
        ])
        .unwrap();
        let config = build_logging_config(&cli);
        assert_eq!(config.level, "debug", "verbose should set level to debug");
    }

    #[test]
    fn test_explicit_level_beats_verbose() {
        let cli = Cli::try_parse_from([
            "recipe-forge",
            "--verbose",
            "--log-level",
            "warn",
            "--log-output",
            "both",
            "--log-file",
            "/tmp/forge.log",
            "config",
            "show",
        ])
        .unwrap();
        let config = build_logging_config(&cli);
        assert_eq!(config.level, "warn");
        assert_eq!(config.output, LogOutput::Both);
        assert_eq!(config.file, std::path::PathBuf::from("/tmp/forge.log"));
    }

    #[test]
    fn test_parse_batch_command() {
        let cli = Cli::try_parse_from([
            "recipe-forge",
            "--user-id",
            "user-9",
            "batch",
            "--requests",
            "requests.json",
            "--delay-ms",
            "250",
        ])
        .unwrap();
        assert_eq!(cli.user_id.as_deref(), Some("user-9"));
        match cli.command {
            recipe_forge::cli::Commands::Batch {
                delay_ms, format, ..
            } => {
                assert_eq!(delay_ms, Some(250));
                assert_eq!(format, "text");
            }
            _ => panic!("expected batch command"),
        }
    }

    #[test]
    fn test_vary_rejects_unknown_kind() {
        let result = Cli::try_parse_from([
            "recipe-forge",
            "vary",
            "--recipe",
            "recipe.json",
            "--kind",
            "saltier",
        ]);
        assert!(result.is_err());
    }
}
