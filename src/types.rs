//! Artifact and inventory types shared by the orchestrator, worker, and CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One ingredient line of a generated recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One preparation step of a generated recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeInstruction {
    pub step: u32,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
}

/// Generated recipe: the artifact produced by a generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedRecipe {
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(default)]
    pub instructions: Vec<RecipeInstruction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bake_time_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tips: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shelf_life: Option<String>,
    /// Derived cost figures (HPP = cost of goods sold)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hpp: Option<CostSummary>,
}

impl GeneratedRecipe {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ingredients: Vec::new(),
            instructions: Vec::new(),
            servings: None,
            category: None,
            description: None,
            difficulty: None,
            prep_time_minutes: None,
            bake_time_minutes: None,
            total_time_minutes: None,
            tips: Vec::new(),
            storage: None,
            shelf_life: None,
            hpp: None,
        }
    }
}

/// Inventory entry the recipe ingredients are matched against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableIngredient {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub price_per_unit: f64,
    #[serde(default)]
    pub current_stock: f64,
}

/// Result of matching one recipe ingredient to inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedIngredient {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub matched_id: Option<String>,
    pub matched_name: Option<String>,
    pub price_per_unit: f64,
    pub total_cost: f64,
    pub match_confidence: f64,
    pub in_stock: bool,
    pub stock_quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdownItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub price_per_unit: f64,
    pub total_cost: f64,
    /// Share of the material cost, whole percent
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedPrices {
    /// 30% margin
    pub minimum: f64,
    /// 50% margin
    pub recommended: f64,
    /// 70% margin
    pub premium: f64,
}

/// Cost figures attached to a generated recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_material_cost: f64,
    pub operational_cost: f64,
    pub total_hpp: f64,
    pub hpp_per_unit: f64,
    #[serde(default)]
    pub ingredient_breakdown: Vec<CostBreakdownItem>,
    pub suggested_prices: SuggestedPrices,
}

/// Fixed set of variation kinds the worker knows how to derive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariationKind {
    Spicier,
    Sweeter,
    Healthier,
    Budget,
    Premium,
}

impl VariationKind {
    pub const ALL: [VariationKind; 5] = [
        VariationKind::Spicier,
        VariationKind::Sweeter,
        VariationKind::Healthier,
        VariationKind::Budget,
        VariationKind::Premium,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VariationKind::Spicier => "spicier",
            VariationKind::Sweeter => "sweeter",
            VariationKind::Healthier => "healthier",
            VariationKind::Budget => "budget",
            VariationKind::Premium => "premium",
        }
    }
}

impl fmt::Display for VariationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VariationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Unknown variation kind '{}' (expected one of: spicier, sweeter, healthier, budget, premium)",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientChange {
    pub original: String,
    pub modified: String,
    pub reason: String,
}

/// Variation derived from a generated recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeVariation {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub ingredient_changes: Vec<IngredientChange>,
    #[serde(default)]
    pub instruction_changes: Vec<String>,
}
