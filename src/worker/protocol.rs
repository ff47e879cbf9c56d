//! Wire contract between the worker channel and the worker thread.
//!
//! Outbound: `{ taskId, taskKind, payload }`.
//! Inbound: `{ taskId, taskKind, success, data?, error? }`.

use crate::types::{AvailableIngredient, RecipeIngredient, RecipeInstruction, VariationKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    MatchIngredients,
    CalculateCosts,
    GenerateVariations,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::MatchIngredients => "match-ingredients",
            TaskKind::CalculateCosts => "calculate-costs",
            TaskKind::GenerateVariations => "generate-variations",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique id of one submission, paired with the task kind for correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(u64);

impl TaskId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        TaskId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        TaskId(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest {
    pub task_id: TaskId,
    pub task_kind: TaskKind,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerReply {
    pub task_id: TaskId,
    pub task_kind: TaskKind,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerReply {
    pub fn ok(task_id: TaskId, task_kind: TaskKind, data: Value) -> Self {
        Self {
            task_id,
            task_kind,
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(task_id: TaskId, task_kind: TaskKind, error: impl Into<String>) -> Self {
        Self {
            task_id,
            task_kind,
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchIngredientsInput {
    pub recipe_ingredients: Vec<RecipeIngredient>,
    pub available_ingredients: Vec<AvailableIngredient>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostInputItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_unit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostCalculationInput {
    pub ingredients: Vec<CostInputItem>,
    pub servings: u32,
    pub operational_cost_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationBase {
    pub name: String,
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(default)]
    pub instructions: Vec<RecipeInstruction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedIngredient {
    pub name: String,
    pub price_per_unit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationInput {
    pub base_recipe: VariationBase,
    pub variation_type: VariationKind,
    #[serde(default)]
    pub available_ingredients: Vec<PricedIngredient>,
}
