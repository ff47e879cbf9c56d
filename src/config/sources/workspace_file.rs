//! Per-workspace files: `config/config.toml`, then `config/<environment>.toml`

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Selects the environment file, e.g. `RECIPE_FORGE_ENV=staging`
pub const ENVIRONMENT_VAR: &str = "RECIPE_FORGE_ENV";

const DEFAULT_ENVIRONMENT: &str = "development";

pub fn environment_name() -> String {
    std::env::var(ENVIRONMENT_VAR)
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}

/// Workspace files in precedence order, lowest first
pub fn layer_paths(workspace_root: &Path, environment: &str) -> [PathBuf; 2] {
    let dir = workspace_root.join("config");
    [dir.join("config.toml"), dir.join(format!("{}.toml", environment))]
}

pub fn add_to_builder(
    mut builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
    environment: &str,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    for path in layer_paths(workspace_root, environment) {
        if path.is_file() {
            debug!(config_path = %path.display(), "Adding workspace configuration");
            builder = builder.add_source(File::from(path.as_path()).required(true));
        }
    }
    Ok(builder)
}
