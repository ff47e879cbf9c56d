//! Generation requests: validation and the normalized payload sent to synthesis.

use crate::error::GenerationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const MIN_NAME_CHARS: usize = 3;
const MIN_INGREDIENTS: usize = 3;
const MAX_FIELD_CHARS: usize = 200;

/// Phrases that indicate an attempt to steer the synthesis prompt.
/// Matched against lowercased, whitespace-collapsed input.
const INJECTION_PATTERNS: &[&str] = &[
    "ignore previous",
    "ignore above",
    "ignore all",
    "ignore the",
    "forget everything",
    "forget all",
    "forget previous",
    "disregard previous",
    "disregard above",
    "disregard all",
    "disregard instructions",
    "new instruction",
    "system:",
    "assistant:",
    "you are now",
    "act as",
    "pretend to be",
    "roleplay",
    "[inst]",
    "[/inst]",
    "<|",
    "reveal your",
    "reveal the prompt",
    "show me your",
];

/// A request to generate one recipe. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub name: String,
    #[serde(rename = "type", default = "default_product_type")]
    pub product_type: String,
    pub servings: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_price: Option<f64>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub preferred_ingredients: Vec<String>,
    #[serde(default)]
    pub custom_ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

fn default_product_type() -> String {
    "main-dish".to_string()
}

impl GenerationRequest {
    pub fn new(name: impl Into<String>, product_type: impl Into<String>, servings: u32) -> Self {
        Self {
            name: name.into(),
            product_type: product_type.into(),
            servings,
            target_price: None,
            dietary_restrictions: Vec::new(),
            preferred_ingredients: Vec::new(),
            custom_ingredients: Vec::new(),
            special_instructions: None,
        }
    }

    pub fn with_preferred<I, S>(mut self, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_ingredients = ingredients.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_custom<I, S>(mut self, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_ingredients = ingredients.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dietary<I, S>(mut self, restrictions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dietary_restrictions = restrictions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_target_price(mut self, price: f64) -> Self {
        self.target_price = Some(price);
        self
    }

    pub fn with_special_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.special_instructions = Some(instructions.into());
        self
    }

    /// Preferred then custom ingredients, deduplicated case-insensitively
    /// keeping the first spelling seen.
    pub fn merged_ingredients(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.preferred_ingredients
            .iter()
            .chain(self.custom_ingredients.iter())
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .filter(|name| seen.insert(name.to_lowercase()))
            .map(str::to_string)
            .collect()
    }

    /// Check the rules the generation core enforces and report all
    /// violations together.
    pub fn validate(&self) -> Result<(), GenerationError> {
        into_result(self.core_problems())
    }

    /// Core rules plus the input-form minimum of `MIN_INGREDIENTS` distinct
    /// ingredients. Front ends call this before submitting.
    pub fn validate_form(&self) -> Result<(), GenerationError> {
        let mut problems = self.core_problems();
        let ingredient_count = self.merged_ingredients().len();
        if ingredient_count < MIN_INGREDIENTS {
            problems.push(format!(
                "at least {} ingredients are required (got {})",
                MIN_INGREDIENTS, ingredient_count
            ));
        }
        into_result(problems)
    }

    fn core_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.name.trim().chars().count() < MIN_NAME_CHARS {
            problems.push(format!(
                "product name must be at least {} characters",
                MIN_NAME_CHARS
            ));
        }

        if self.servings < 1 {
            problems.push("servings must be at least 1".to_string());
        }

        if let Some(price) = self.target_price {
            if !price.is_finite() || price <= 0.0 {
                problems.push("target price must be a positive number".to_string());
            }
        }

        if contains_injection(&self.name) || contains_injection(&self.product_type) {
            problems.push("product name or type contains disallowed instructions".to_string());
        }

        problems
    }
}

fn into_result(problems: Vec<String>) -> Result<(), GenerationError> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(GenerationError::Validation(problems))
    }
}

/// Normalized payload for the external synthesis collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisPayload {
    pub product_name: String,
    pub product_type: String,
    pub servings: u32,
    pub preferred_ingredients: Vec<String>,
    pub dietary_restrictions: Vec<String>,
    pub budget: f64,
    pub special_instructions: String,
    pub user_id: String,
}

impl SynthesisPayload {
    pub fn from_request(request: &GenerationRequest, user_id: &str) -> Self {
        Self {
            product_name: sanitize_text(&request.name),
            product_type: sanitize_text(&request.product_type),
            servings: request.servings,
            preferred_ingredients: request
                .merged_ingredients()
                .iter()
                .map(|name| sanitize_text(name))
                .filter(|name| !name.is_empty())
                .collect(),
            dietary_restrictions: request
                .dietary_restrictions
                .iter()
                .map(|tag| sanitize_text(tag))
                .filter(|tag| !tag.is_empty())
                .collect(),
            budget: request.target_price.unwrap_or(0.0),
            special_instructions: request
                .special_instructions
                .as_deref()
                .map(sanitize_text)
                .unwrap_or_default(),
            user_id: user_id.to_string(),
        }
    }
}

/// Strip prompt-structuring characters, trim, and cap length.
pub fn sanitize_text(input: &str) -> String {
    let stripped: String = input
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '{' | '}' | '[' | ']' | '`' | '\\'))
        .collect();
    stripped.trim().chars().take(MAX_FIELD_CHARS).collect()
}

fn contains_injection(input: &str) -> bool {
    let collapsed = input
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" :", ":");
    INJECTION_PATTERNS
        .iter()
        .any(|pattern| collapsed.contains(pattern))
}
