//! Synthesis collaborator
//!
//! The orchestrator hands a sanitized payload to a `SynthesisClient` and gets a
//! recipe back. The HTTP client posts to the generation endpoint; tests plug in
//! in-process stubs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::request::SynthesisPayload;
use crate::types::{CostSummary, GeneratedRecipe};

/// Produces a recipe for a normalized request payload
#[async_trait]
pub trait SynthesisClient: Send + Sync {
    async fn synthesize(&self, payload: SynthesisPayload)
        -> Result<GeneratedRecipe, GenerationError>;

    fn name(&self) -> &str {
        "synthesis"
    }
}

#[derive(Debug, Clone)]
pub struct HttpSynthesisConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpSynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SYNTHESIS_ENDPOINT.to_string(),
            api_key: None,
            request_timeout: Duration::from_millis(60_000),
            connect_timeout: Duration::from_millis(10_000),
        }
    }
}

pub const DEFAULT_SYNTHESIS_ENDPOINT: &str = "http://localhost:3000/api/ai/generate-recipe";

/// Synthesis over HTTP: `POST {endpoint}` with the payload as JSON
pub struct HttpSynthesisClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl HttpSynthesisClient {
    pub fn new(config: HttpSynthesisConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                GenerationError::SynthesisFailed(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self {
            client,
            endpoint: config.endpoint,
            api_key: config.api_key,
            request_timeout: config.request_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_http_error(&self, error: reqwest::Error) -> GenerationError {
        if error.is_timeout() {
            GenerationError::SynthesisTimeout(self.request_timeout.as_millis() as u64)
        } else if error.is_connect() {
            GenerationError::SynthesisFailed(format!("Connection error: {}", error))
        } else {
            GenerationError::SynthesisFailed(format!("HTTP error: {}", error))
        }
    }
}

#[async_trait]
impl SynthesisClient for HttpSynthesisClient {
    async fn synthesize(
        &self,
        payload: SynthesisPayload,
    ) -> Result<GeneratedRecipe, GenerationError> {
        debug!(
            endpoint = %self.endpoint,
            product = %payload.product_name,
            servings = payload.servings,
            "Requesting recipe synthesis"
        );

        let mut request_builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json");
        if let Some(api_key) = &self.api_key {
            request_builder =
                request_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request_builder
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.map_http_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(match status.as_u16() {
                401 | 403 => GenerationError::Unauthenticated,
                504 => GenerationError::SynthesisTimeout(self.request_timeout.as_millis() as u64),
                _ => GenerationError::SynthesisFailed(format!(
                    "Request failed with status {}: {}",
                    status,
                    error_message(&error_text)
                )),
            });
        }

        let body: Value = response.json().await.map_err(|e| {
            GenerationError::SynthesisFailed(format!("Failed to parse response: {}", e))
        })?;
        parse_recipe_body(body)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Extract the recipe from a synthesis response.
///
/// Accepts `{ "recipe": {...} }` or a bare recipe object. A server-side cost
/// block that does not match `CostSummary` is dropped; costs are recomputed
/// locally during the calculating stage.
pub fn parse_recipe_body(body: Value) -> Result<GeneratedRecipe, GenerationError> {
    if let Some(error) = body.get("error").and_then(Value::as_str) {
        if body.get("recipe").is_none() {
            return Err(GenerationError::SynthesisFailed(error.to_string()));
        }
    }

    let mut recipe = match body {
        Value::Object(mut map) => match map.remove("recipe") {
            Some(inner) => inner,
            None => Value::Object(map),
        },
        other => {
            return Err(GenerationError::SynthesisFailed(format!(
                "Unexpected response body: {}",
                other
            )))
        }
    };

    if let Some(fields) = recipe.as_object_mut() {
        let keep_costs = fields
            .get("hpp")
            .map(|hpp| serde_json::from_value::<CostSummary>(hpp.clone()).is_ok())
            .unwrap_or(true);
        if !keep_costs {
            warn!("Dropping unrecognized cost block from synthesis response");
            fields.remove("hpp");
        }
    }

    let recipe: GeneratedRecipe = serde_json::from_value(recipe)
        .map_err(|e| GenerationError::SynthesisFailed(format!("Malformed recipe: {}", e)))?;
    if recipe.name.trim().is_empty() {
        return Err(GenerationError::SynthesisFailed(
            "Recipe has no name".to_string(),
        ));
    }
    if recipe.ingredients.is_empty() {
        return Err(GenerationError::SynthesisFailed(
            "Recipe has no ingredients".to_string(),
        ));
    }
    Ok(recipe)
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.to_string())
}
