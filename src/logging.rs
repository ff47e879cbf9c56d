//! Logging
//!
//! Structured `tracing` output for the library and the CLI. The subscriber is
//! configured from [`LoggingConfig`]; `RECIPE_FORGE_LOG*` environment
//! variables take precedence over it.

use crate::error::GenerationError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt as layer_fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tracing_subscriber::{EnvFilter, Registry};

/// Full filter directive, e.g. `recipe_forge=debug,reqwest=warn`
pub const LOG_FILTER_ENV: &str = "RECIPE_FORGE_LOG";
pub const LOG_FORMAT_ENV: &str = "RECIPE_FORGE_LOG_FORMAT";
pub const LOG_OUTPUT_ENV: &str = "RECIPE_FORGE_LOG_OUTPUT";
/// Extra per-module levels, e.g. `recipe_forge::worker=trace`
pub const LOG_MODULES_ENV: &str = "RECIPE_FORGE_LOG_MODULES";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}' (expected text or json)", other)),
        }
    }
}

/// Where log lines go. Recipe output owns stdout, so stderr is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    File,
    /// stderr and the log file
    Both,
}

impl LogOutput {
    pub fn writes_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            "both" => Ok(LogOutput::Both),
            other => Err(format!(
                "unknown log output '{}' (expected stdout, stderr, file, or both)",
                other
            )),
        }
    }
}

impl fmt::Display for LogOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogOutput::Stdout => "stdout",
            LogOutput::Stderr => "stderr",
            LogOutput::File => "file",
            LogOutput::Both => "both",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error, or off
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Used when `output` is `file` or `both`
    pub file: PathBuf,
    /// ANSI colors for text logs on a terminal
    pub color: bool,
    /// Per-module levels layered over `level`
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            output: LogOutput::Stderr,
            file: default_log_file(),
            color: true,
            modules: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Check `level` and every module level, returning the first bad one
    pub fn check_levels(&self) -> Result<(), String> {
        parse_level(&self.level)?;
        for (module, level) in &self.modules {
            parse_level(level).map_err(|e| format!("module '{}': {}", module, e))?;
        }
        Ok(())
    }
}

/// `<data dir>/recipe-forge.log`, falling back to `.recipe-forge/recipe-forge.log`
pub fn default_log_file() -> PathBuf {
    match ProjectDirs::from("", "", "recipe-forge") {
        Some(dirs) => dirs.data_local_dir().join("recipe-forge.log"),
        None => Path::new(".recipe-forge").join("recipe-forge.log"),
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, String> {
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| format!("invalid log level '{}'", level))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), GenerationError> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);

    let format = env_override(LOG_FORMAT_ENV)?.unwrap_or(config.format);
    let output = env_override(LOG_OUTPUT_ENV)?.unwrap_or(config.output);
    let filter = build_filter(config)?;
    let writer = build_writer(output, &config.file)?;
    let ansi = config.color && format == LogFormat::Text && !output.writes_file();

    let registry = Registry::default().with(filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(
                layer_fmt::layer()
                    .json()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                layer_fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
    };
    installed.map_err(|e| GenerationError::Config(format!("Failed to install logger: {}", e)))
}

fn env_override<T: FromStr<Err = String>>(var: &str) -> Result<Option<T>, GenerationError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|e| GenerationError::Config(format!("{}: {}", var, e))),
        Err(_) => Ok(None),
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, GenerationError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_FILTER_ENV) {
        return Ok(filter);
    }

    let base = parse_level(&config.level).map_err(GenerationError::Config)?;
    let mut filter = EnvFilter::new(base.to_string());

    let from_env = std::env::var(LOG_MODULES_ENV)
        .map(|entries| parse_module_levels(&entries))
        .unwrap_or_default();
    for (module, level) in config.modules.iter().chain(from_env.iter().map(|(m, l)| (m, l))) {
        let directive = format!("{}={}", module, level).parse().map_err(|e| {
            GenerationError::Config(format!("Invalid log directive for {}: {}", module, e))
        })?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

fn build_writer(output: LogOutput, file: &Path) -> Result<BoxMakeWriter, GenerationError> {
    Ok(match output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::File => BoxMakeWriter::new(Mutex::new(open_log_file(file)?)),
        LogOutput::Both => {
            BoxMakeWriter::new(std::io::stderr.and(Mutex::new(open_log_file(file)?)))
        }
    })
}

fn open_log_file(path: &Path) -> Result<File, GenerationError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            GenerationError::Config(format!("Cannot create log directory {:?}: {}", parent, e))
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| GenerationError::Config(format!("Cannot open log file {:?}: {}", path, e)))
}

/// `module=level,module=level`; malformed entries are skipped
fn parse_module_levels(entries: &str) -> Vec<(String, String)> {
    entries
        .split(',')
        .filter_map(|entry| {
            let (module, level) = entry.split_once('=')?;
            let (module, level) = (module.trim(), level.trim());
            if module.is_empty() || level.is_empty() {
                None
            } else {
                Some((module.to_string(), level.to_string()))
            }
        })
        .collect()
}
