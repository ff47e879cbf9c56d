//! Configuration System
//!
//! Layered configuration for the generation core and the CLI. Precedence,
//! lowest to highest: built-in defaults, global file, workspace files,
//! explicit file, `RECIPE_FORGE__SECTION__KEY` environment variables.

use crate::batch::FixedDelay;
use crate::cache::RecipeCache;
use crate::error::GenerationError;
use crate::logging::LoggingConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::synthesis::{HttpSynthesisConfig, DEFAULT_SYNTHESIS_ENDPOINT};
use crate::worker::tasks::DEFAULT_MATCH_THRESHOLD;
use config::{Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

mod defaults;
mod sources;

pub use sources::global_file::global_config_path;
pub use sources::workspace_file::ENVIRONMENT_VAR;

/// Prefix of environment overrides, e.g. `RECIPE_FORGE__CACHE__CAPACITY`
pub const ENV_PREFIX: &str = "RECIPE_FORGE";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForgeConfig {
    #[serde(default)]
    pub synthesis: SynthesisSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub batch: BatchSettings,

    #[serde(default)]
    pub costing: CostingSettings,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Bearer token sent with synthesis requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_endpoint() -> String {
    DEFAULT_SYNTHESIS_ENDPOINT.to_string()
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Maximum cached recipes; 0 means unbounded
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Entry lifetime; absent means valid until restart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

fn default_capacity() -> usize {
    256
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            ttl_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSettings {
    #[serde(default = "default_inter_item_delay_ms")]
    pub inter_item_delay_ms: u64,
}

fn default_inter_item_delay_ms() -> u64 {
    1_000
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            inter_item_delay_ms: default_inter_item_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostingSettings {
    /// Overhead added on top of material cost, in percent
    #[serde(default = "default_operational_cost_percent")]
    pub operational_cost_percent: f64,

    /// Minimum similarity for an inventory match (0.0-1.0)
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
}

fn default_operational_cost_percent() -> f64 {
    30.0
}

fn default_match_threshold() -> f64 {
    DEFAULT_MATCH_THRESHOLD
}

impl Default for CostingSettings {
    fn default() -> Self {
        Self {
            operational_cost_percent: default_operational_cost_percent(),
            match_threshold: default_match_threshold(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Caller identity; generation is refused without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    Synthesis(String),
    Cache(String),
    Costing(String),
    Logging(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValidationError::Synthesis(msg) => write!(f, "Synthesis: {}", msg),
            ConfigValidationError::Cache(msg) => write!(f, "Cache: {}", msg),
            ConfigValidationError::Costing(msg) => write!(f, "Costing: {}", msg),
            ConfigValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

impl ForgeConfig {
    /// Validate the entire configuration, reporting every problem
    pub fn validate(&self) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        let endpoint = self.synthesis.endpoint.trim();
        if endpoint.is_empty() {
            errors.push(ConfigValidationError::Synthesis(
                "endpoint cannot be empty".to_string(),
            ));
        } else if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            errors.push(ConfigValidationError::Synthesis(format!(
                "endpoint '{}' must be an http(s) URL",
                endpoint
            )));
        }
        if self.synthesis.timeout_ms == 0 {
            errors.push(ConfigValidationError::Synthesis(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.synthesis.connect_timeout_ms == 0 {
            errors.push(ConfigValidationError::Synthesis(
                "connect_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.cache.ttl_secs == Some(0) {
            errors.push(ConfigValidationError::Cache(
                "ttl_secs must be greater than 0 when set".to_string(),
            ));
        }

        let percent = self.costing.operational_cost_percent;
        if !percent.is_finite() || percent < 0.0 {
            errors.push(ConfigValidationError::Costing(format!(
                "operational_cost_percent must be a non-negative number (got {})",
                percent
            )));
        }
        let threshold = self.costing.match_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            errors.push(ConfigValidationError::Costing(format!(
                "match_threshold must be between 0.0 and 1.0 (got {})",
                threshold
            )));
        }

        if let Err(message) = self.logging.check_levels() {
            errors.push(ConfigValidationError::Logging(message));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            synthesis_timeout: Duration::from_millis(self.synthesis.timeout_ms),
            operational_cost_percent: self.costing.operational_cost_percent,
            match_threshold: self.costing.match_threshold,
        }
    }

    pub fn http_synthesis_config(&self) -> HttpSynthesisConfig {
        HttpSynthesisConfig {
            endpoint: self.synthesis.endpoint.clone(),
            api_key: self.synthesis.api_key.clone(),
            request_timeout: Duration::from_millis(self.synthesis.timeout_ms),
            connect_timeout: Duration::from_millis(self.synthesis.connect_timeout_ms),
        }
    }

    pub fn build_cache(&self) -> RecipeCache {
        RecipeCache::new(
            self.cache.capacity,
            self.cache.ttl_secs.map(Duration::from_secs),
        )
    }

    pub fn pacing(&self) -> FixedDelay {
        FixedDelay(Duration::from_millis(self.batch.inter_item_delay_ms))
    }

    /// Render as TOML, e.g. for `config show`
    pub fn to_toml(&self) -> Result<String, GenerationError> {
        toml::to_string_pretty(self)
            .map_err(|e| GenerationError::Config(format!("Failed to render config: {}", e)))
    }
}

/// Builds a `ForgeConfig` from the layered sources
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    workspace_root: Option<PathBuf>,
    global_file: Option<PathBuf>,
    explicit_file: Option<PathBuf>,
    environment: String,
    env_overrides: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader reading the global file, `$RECIPE_FORGE_ENV`, and env overrides
    pub fn new() -> Self {
        Self {
            workspace_root: None,
            global_file: global_config_path(),
            explicit_file: None,
            environment: sources::workspace_file::environment_name(),
            env_overrides: true,
        }
    }

    pub fn workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Override the global file location; `None` skips that layer
    pub fn global_file(mut self, path: Option<PathBuf>) -> Self {
        self.global_file = path;
        self
    }

    pub fn explicit_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }

    pub fn environment(mut self, name: impl Into<String>) -> Self {
        self.environment = name.into();
        self
    }

    pub fn without_env_overrides(mut self) -> Self {
        self.env_overrides = false;
        self
    }

    pub fn load(&self) -> Result<ForgeConfig, GenerationError> {
        let mut builder = defaults::builder_with_defaults()?;
        builder = sources::global_file::add_to_builder(builder, self.global_file.as_deref())?;

        if let Some(root) = &self.workspace_root {
            builder = sources::workspace_file::add_to_builder(builder, root, &self.environment)?;
        }

        if let Some(path) = &self.explicit_file {
            if !path.exists() {
                return Err(GenerationError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path.as_path()).required(true));
        }

        if self.env_overrides {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: ForgeConfig = builder.build()?.try_deserialize()?;
        debug!(
            workspace = ?self.workspace_root,
            environment = %self.environment,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load a single file on top of the defaults, ignoring every other layer
    pub fn load_from_file(path: &Path) -> Result<ForgeConfig, GenerationError> {
        let config = defaults::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load, then reject invalid values with every problem listed
    pub fn load_validated(&self) -> Result<ForgeConfig, GenerationError> {
        let config = self.load()?;
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            GenerationError::Config(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        Ok(config)
    }
}
