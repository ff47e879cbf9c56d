//! CLI parse: clap types for recipe-forge. No behavior; definitions only.

use crate::logging::{LogFormat, LogOutput};
use crate::types::VariationKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// recipe-forge - costed recipe generation with caching and batch runs
#[derive(Parser)]
#[command(name = "recipe-forge")]
#[command(about = "Generate costed recipes through the recipe synthesis service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (for config/config.toml)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (layered above workspace config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Caller identity sent with synthesis requests
    #[arg(long)]
    pub user_id: Option<String>,

    /// Shorthand for --log-level debug
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log line format: text or json
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Log destination: stdout, stderr, file, or both (stderr and file)
    #[arg(long)]
    pub log_output: Option<LogOutput>,

    /// Log file path, used when the destination includes the file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate one recipe from a request file
    Generate {
        /// JSON file holding one generation request
        #[arg(long)]
        request: PathBuf,
        /// JSON file listing available ingredients for costing
        #[arg(long)]
        inventory: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "json")]
        format: String,
    },
    /// Generate recipes for every request in a file, one at a time
    Batch {
        /// JSON file holding an array of generation requests
        #[arg(long)]
        requests: PathBuf,
        /// Pause between items in milliseconds (overrides batch.inter_item_delay_ms)
        #[arg(long)]
        delay_ms: Option<u64>,
        /// JSON file listing available ingredients for costing
        #[arg(long)]
        inventory: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Derive a variation of an existing recipe
    Vary {
        /// JSON file holding a generated recipe
        #[arg(long)]
        recipe: PathBuf,
        /// Variation kind: spicier, sweeter, healthier, budget, premium
        #[arg(long)]
        kind: VariationKind,
        /// JSON file listing available ingredients
        #[arg(long)]
        inventory: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Configuration commands (show, validate)
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Check the effective configuration and list every problem
    Validate,
}
