//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::batch::{BatchRunner, FixedDelay};
use crate::config::{ConfigLoader, ForgeConfig};
use crate::error::GenerationError;
use crate::orchestrator::GenerationOrchestrator;
use crate::progress::{ProgressBus, ProgressEvent};
use crate::request::GenerationRequest;
use crate::synthesis::HttpSynthesisClient;
use crate::types::{AvailableIngredient, GeneratedRecipe};
use crate::variation::generate_variation;
use crate::worker::{RecipeWorker, WorkerChannel};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cli::help::command_name;
use crate::cli::parse::{Commands, ConfigCommands};
use crate::cli::presentation::{
    format_batch_result_json, format_batch_result_text, format_config_validation,
    format_progress_line, format_recipe_json, format_recipe_text, format_variation_json,
    format_variation_text,
};

/// Runtime context for CLI execution: workspace and the layered configuration.
/// Built from workspace path, optional config path, and CLI overrides using ConfigLoader only.
pub struct RunContext {
    config: ForgeConfig,
    workspace_root: PathBuf,
}

impl RunContext {
    /// Load configuration for `workspace_root`. `--user-id` wins over `session.user_id`.
    /// Validation is deferred so `config validate` can report every problem.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        user_id: Option<String>,
    ) -> Result<Self, GenerationError> {
        let mut loader = ConfigLoader::new().workspace_root(workspace_root.clone());
        if let Some(path) = config_path {
            loader = loader.explicit_file(path);
        }
        let mut config = loader.load()?;
        if let Some(user_id) = user_id {
            config.session.user_id = Some(user_id);
        }
        Ok(Self {
            config,
            workspace_root,
        })
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub async fn execute(&self, command: &Commands) -> Result<String, GenerationError> {
        let name = command_name(command);
        let started = Instant::now();
        info!(command = %name, workspace = %self.workspace_root.display(), "Running command");

        let result = self.dispatch(command).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(command = %name, elapsed_ms, "Command finished"),
            Err(err) => warn!(command = %name, elapsed_ms, error = %err, "Command failed"),
        }
        result
    }

    async fn dispatch(&self, command: &Commands) -> Result<String, GenerationError> {
        match command {
            Commands::Generate {
                request,
                inventory,
                format,
            } => {
                self.ensure_valid()?;
                let request: GenerationRequest = read_json(request)?;
                request.validate_form()?;
                let inventory = read_inventory(inventory.as_deref())?;

                let (bus, events) = ProgressBus::new_pair();
                let printer = spawn_progress_printer(events);
                let orchestrator = self.orchestrator(inventory, bus)?;
                let result = orchestrator.generate(&request).await;
                orchestrator.dispose();
                drop(orchestrator);
                let _ = printer.await;

                let recipe = result?;
                format_recipe(&recipe, format)
            }
            Commands::Batch {
                requests,
                delay_ms,
                inventory,
                format,
            } => {
                self.ensure_valid()?;
                let requests: Vec<GenerationRequest> = read_json(requests)?;
                validate_batch_form(&requests)?;
                let inventory = read_inventory(inventory.as_deref())?;
                let pacing = match delay_ms {
                    Some(ms) => FixedDelay(Duration::from_millis(*ms)),
                    None => self.config.pacing(),
                };

                let (bus, events) = ProgressBus::new_pair();
                let printer = spawn_progress_printer(events);
                let orchestrator = Arc::new(self.orchestrator(inventory, bus)?);
                let runner =
                    BatchRunner::new(Arc::clone(&orchestrator)).with_pacing(Arc::new(pacing));
                let result = runner.run_batch(requests).await;
                orchestrator.dispose();
                drop(runner);
                drop(orchestrator);
                let _ = printer.await;

                let result = result?;
                if format == "json" {
                    format_batch_result_json(&result)
                } else {
                    Ok(format_batch_result_text(&result))
                }
            }
            Commands::Vary {
                recipe,
                kind,
                inventory,
                format,
            } => {
                self.ensure_valid()?;
                let recipe: GeneratedRecipe = read_json(recipe)?;
                let inventory = read_inventory(inventory.as_deref())?;
                let worker =
                    WorkerChannel::spawn(RecipeWorker::new(self.config.costing.match_threshold));
                let variation = generate_variation(&worker, &recipe, *kind, &inventory).await;
                worker.shutdown();
                match variation {
                    Some(variation) if format == "json" => format_variation_json(&variation),
                    Some(variation) => Ok(format_variation_text(&variation)),
                    None => Err(GenerationError::WorkerUnavailable(format!(
                        "no {} variation could be produced for '{}'",
                        kind, recipe.name
                    ))),
                }
            }
            Commands::Config { command } => match command {
                ConfigCommands::Show => self.config.to_toml(),
                ConfigCommands::Validate => {
                    let result = self.config.validate();
                    let text = format_config_validation(&result);
                    match result {
                        Ok(()) => Ok(text),
                        Err(_) => Err(GenerationError::Config(text)),
                    }
                }
            },
        }
    }

    fn ensure_valid(&self) -> Result<(), GenerationError> {
        self.config.validate().map_err(|errors| {
            GenerationError::Config(format_config_validation(&Err(errors)))
        })
    }

    fn orchestrator(
        &self,
        inventory: Vec<AvailableIngredient>,
        bus: ProgressBus,
    ) -> Result<GenerationOrchestrator, GenerationError> {
        let synthesis = Arc::new(HttpSynthesisClient::new(self.config.http_synthesis_config())?);
        let mut builder = GenerationOrchestrator::builder(synthesis)
            .cache(Arc::new(self.config.build_cache()))
            .worker(WorkerChannel::spawn(RecipeWorker::new(
                self.config.costing.match_threshold,
            )))
            .config(self.config.orchestrator_config())
            .inventory(inventory)
            .progress_bus(bus);
        if let Some(user_id) = &self.config.session.user_id {
            builder = builder.user_id(user_id.clone());
        }
        Ok(builder.build())
    }
}

/// Progress lines go to stderr so stdout carries only the command result.
/// The task ends once every bus sender is dropped.
fn spawn_progress_printer(mut events: UnboundedReceiver<ProgressEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            eprintln!("{}", format_progress_line(&event));
        }
    })
}

fn format_recipe(recipe: &GeneratedRecipe, format: &str) -> Result<String, GenerationError> {
    if format == "text" {
        Ok(format_recipe_text(recipe))
    } else {
        format_recipe_json(recipe)
    }
}

/// Apply the form rules `generate` applies to every batch item, reporting
/// problems per item number before any item runs.
fn validate_batch_form(requests: &[GenerationRequest]) -> Result<(), GenerationError> {
    let mut problems = Vec::new();
    for (index, request) in requests.iter().enumerate() {
        if let Err(GenerationError::Validation(item_problems)) = request.validate_form() {
            problems.extend(
                item_problems
                    .into_iter()
                    .map(|problem| format!("item {}: {}", index + 1, problem)),
            );
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(GenerationError::Validation(problems))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, GenerationError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        GenerationError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        GenerationError::Config(format!("Failed to parse {}: {}", path.display(), e))
    })
}

fn read_inventory(path: Option<&Path>) -> Result<Vec<AvailableIngredient>, GenerationError> {
    match path {
        Some(path) => read_json(path),
        None => Ok(Vec::new()),
    }
}
