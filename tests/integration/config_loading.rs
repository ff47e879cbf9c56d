//! Layered configuration loading from files and the environment.

use recipe_forge::config::{ConfigLoader, ForgeConfig};
use std::fs;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

/// Serializes tests that touch process environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn loader(workspace: &TempDir) -> ConfigLoader {
    ConfigLoader::new()
        .global_file(None)
        .environment("test")
        .workspace_root(workspace.path())
}

fn write_workspace_config(workspace: &TempDir, name: &str, body: &str) {
    let dir = workspace.path().join("config");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), body).unwrap();
}

#[test]
fn global_then_workspace_then_explicit() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let workspace = TempDir::new().unwrap();
    let global = workspace.path().join("global.toml");
    fs::write(
        &global,
        r#"
[synthesis]
endpoint = "https://recipes.example.com/api/ai/generate-recipe"
timeout_ms = 30000

[cache]
capacity = 16
"#,
    )
    .unwrap();
    write_workspace_config(
        &workspace,
        "config.toml",
        r#"
[cache]
capacity = 64

[batch]
inter_item_delay_ms = 250
"#,
    );
    let explicit = workspace.path().join("override.toml");
    fs::write(&explicit, "[batch]\ninter_item_delay_ms = 0\n").unwrap();

    let config = loader(&workspace)
        .global_file(Some(global))
        .explicit_file(&explicit)
        .without_env_overrides()
        .load()
        .unwrap();

    assert_eq!(
        config.synthesis.endpoint,
        "https://recipes.example.com/api/ai/generate-recipe"
    );
    assert_eq!(config.cache.capacity, 64);
    assert_eq!(config.batch.inter_item_delay_ms, 0);
    assert_eq!(
        config.orchestrator_config().synthesis_timeout,
        Duration::from_millis(30_000)
    );
}

#[test]
fn environment_variables_override_files() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let workspace = TempDir::new().unwrap();
    write_workspace_config(&workspace, "config.toml", "[cache]\ncapacity = 64\n");

    std::env::set_var("RECIPE_FORGE__CACHE__CAPACITY", "8");
    std::env::set_var("RECIPE_FORGE__SESSION__USER_ID", "owner-7");
    let loaded = loader(&workspace).load();
    std::env::remove_var("RECIPE_FORGE__CACHE__CAPACITY");
    std::env::remove_var("RECIPE_FORGE__SESSION__USER_ID");

    let config = loaded.unwrap();
    assert_eq!(config.cache.capacity, 8);
    assert_eq!(config.session.user_id.as_deref(), Some("owner-7"));
}

#[test]
fn missing_explicit_file_is_an_error() {
    let workspace = TempDir::new().unwrap();
    let result = loader(&workspace)
        .without_env_overrides()
        .explicit_file(workspace.path().join("absent.toml"))
        .load();
    assert!(result.is_err());
}

#[test]
fn invalid_values_fail_validated_load() {
    let workspace = TempDir::new().unwrap();
    write_workspace_config(
        &workspace,
        "test.toml",
        r#"
[costing]
match_threshold = 2.0

[logging]
level = "chatty"
"#,
    );

    let err = loader(&workspace)
        .without_env_overrides()
        .load_validated()
        .unwrap_err()
        .to_string();
    assert!(err.contains("match_threshold"));
    assert!(err.contains("chatty"));
}

#[test]
fn unknown_log_output_is_rejected_on_load() {
    let workspace = TempDir::new().unwrap();
    write_workspace_config(&workspace, "test.toml", "[logging]\noutput = \"syslog\"\n");

    let err = loader(&workspace)
        .without_env_overrides()
        .load()
        .unwrap_err()
        .to_string();
    assert!(err.contains("syslog"));
}

#[test]
fn rendered_toml_loads_back_identically() {
    let workspace = TempDir::new().unwrap();
    let mut config = ForgeConfig::default();
    config.cache.ttl_secs = Some(600);
    config.session.user_id = Some("owner-1".to_string());
    let path = workspace.path().join("rendered.toml");
    fs::write(&path, config.to_toml().unwrap()).unwrap();

    let reloaded = ConfigLoader::load_from_file(&path).unwrap();
    assert_eq!(reloaded, config);
}
