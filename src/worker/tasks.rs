//! Task handlers executed on the worker thread.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::types::{
    AvailableIngredient, CostBreakdownItem, CostSummary, IngredientChange, MatchedIngredient,
    RecipeIngredient, RecipeVariation, SuggestedPrices, VariationKind,
};
use crate::worker::protocol::{
    CostCalculationInput, MatchIngredientsInput, TaskKind, VariationInput,
};

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

/// Executes one task on the worker thread. Errors are reported back to the
/// caller as a failed reply; panics take the worker down.
pub trait TaskHandler: Send + 'static {
    fn handle(&mut self, kind: TaskKind, payload: Value) -> Result<Value, String>;
}

impl<F> TaskHandler for F
where
    F: FnMut(TaskKind, Value) -> Result<Value, String> + Send + 'static,
{
    fn handle(&mut self, kind: TaskKind, payload: Value) -> Result<Value, String> {
        self(kind, payload)
    }
}

/// Handler for the recipe task kinds
#[derive(Debug, Clone)]
pub struct RecipeWorker {
    match_threshold: f64,
}

impl RecipeWorker {
    pub fn new(match_threshold: f64) -> Self {
        Self { match_threshold }
    }
}

impl Default for RecipeWorker {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD)
    }
}

impl TaskHandler for RecipeWorker {
    fn handle(&mut self, kind: TaskKind, payload: Value) -> Result<Value, String> {
        match kind {
            TaskKind::MatchIngredients => {
                let input: MatchIngredientsInput = decode(kind, payload)?;
                encode(match_ingredients(
                    &input.recipe_ingredients,
                    &input.available_ingredients,
                    self.match_threshold,
                ))
            }
            TaskKind::CalculateCosts => {
                let input: CostCalculationInput = decode(kind, payload)?;
                encode(calculate_costs(&input))
            }
            TaskKind::GenerateVariations => {
                let input: VariationInput = decode(kind, payload)?;
                encode(generate_variation(&input))
            }
        }
    }
}

fn decode<T: DeserializeOwned>(kind: TaskKind, payload: Value) -> Result<T, String> {
    serde_json::from_value(payload).map_err(|e| format!("Invalid {} payload: {}", kind, e))
}

fn encode<T: Serialize>(result: T) -> Result<Value, String> {
    serde_json::to_value(result).map_err(|e| format!("Failed to encode worker result: {}", e))
}

/// Match each recipe ingredient to the most similar inventory entry at or
/// above `threshold`.
pub fn match_ingredients(
    recipe_ingredients: &[RecipeIngredient],
    available: &[AvailableIngredient],
    threshold: f64,
) -> Vec<MatchedIngredient> {
    recipe_ingredients
        .iter()
        .map(|ingredient| {
            let wanted = normalize_name(&ingredient.name);
            let mut best: Option<&AvailableIngredient> = None;
            let mut best_score = 0.0;
            for candidate in available {
                let score = similarity(&wanted, &normalize_name(&candidate.name));
                if score > best_score && score >= threshold {
                    best_score = score;
                    best = Some(candidate);
                }
            }

            let price_per_unit = best.map(|b| b.price_per_unit).unwrap_or(0.0);
            MatchedIngredient {
                name: ingredient.name.clone(),
                quantity: ingredient.quantity,
                unit: ingredient.unit.clone(),
                matched_id: best.map(|b| b.id.clone()),
                matched_name: best.map(|b| b.name.clone()),
                price_per_unit,
                total_cost: price_per_unit * ingredient.quantity,
                match_confidence: best_score,
                in_stock: best
                    .map(|b| b.current_stock >= ingredient.quantity)
                    .unwrap_or(false),
                stock_quantity: best.map(|b| b.current_stock).unwrap_or(0.0),
            }
        })
        .collect()
}

/// Material cost, operational overhead, HPP, and margin-based price points
pub fn calculate_costs(input: &CostCalculationInput) -> CostSummary {
    let mut breakdown: Vec<CostBreakdownItem> = input
        .ingredients
        .iter()
        .map(|item| {
            let price = item.price_per_unit.unwrap_or(0.0);
            CostBreakdownItem {
                name: item.name.clone(),
                quantity: item.quantity,
                unit: item.unit.clone(),
                price_per_unit: price,
                total_cost: price * item.quantity,
                percentage: 0.0,
            }
        })
        .collect();

    let material: f64 = breakdown.iter().map(|item| item.total_cost).sum();
    for item in &mut breakdown {
        item.percentage = if material > 0.0 {
            (item.total_cost / material * 100.0).round()
        } else {
            0.0
        };
    }

    let operational = material * (input.operational_cost_percent / 100.0);
    let total = material + operational;
    let per_unit = if input.servings > 0 {
        total / f64::from(input.servings)
    } else {
        total
    };

    CostSummary {
        total_material_cost: material.round(),
        operational_cost: operational.round(),
        total_hpp: total.round(),
        hpp_per_unit: per_unit.round(),
        ingredient_breakdown: breakdown,
        suggested_prices: SuggestedPrices {
            minimum: (per_unit / 0.7).round(),
            recommended: (per_unit / 0.5).round(),
            premium: (per_unit / 0.3).round(),
        },
    }
}

struct Substitution {
    pattern: &'static str,
    replacement: &'static str,
    multiplier: f64,
    reason: &'static str,
}

struct VariationRule {
    name_suffix: &'static str,
    description: &'static str,
    substitutions: &'static [Substitution],
    instruction_additions: &'static [&'static str],
}

// Ingredient patterns are Indonesian because inventory names are.
fn variation_rule(kind: VariationKind) -> VariationRule {
    match kind {
        VariationKind::Spicier => VariationRule {
            name_suffix: " Pedas",
            description: "Versi lebih pedas dengan tambahan cabai dan rempah",
            substitutions: &[
                Substitution {
                    pattern: "cabai",
                    replacement: "cabai rawit",
                    multiplier: 1.5,
                    reason: "Tingkatkan level pedas",
                },
                Substitution {
                    pattern: "lada",
                    replacement: "lada hitam",
                    multiplier: 2.0,
                    reason: "Tambah rasa pedas",
                },
            ],
            instruction_additions: &[
                "Tambahkan cabai rawit iris tipis untuk extra pedas",
                "Sajikan dengan sambal sebagai pelengkap",
            ],
        },
        VariationKind::Sweeter => VariationRule {
            name_suffix: " Manis",
            description: "Versi lebih manis cocok untuk yang suka rasa manis",
            substitutions: &[
                Substitution {
                    pattern: "gula",
                    replacement: "gula",
                    multiplier: 1.3,
                    reason: "Tingkatkan rasa manis",
                },
                Substitution {
                    pattern: "coklat",
                    replacement: "coklat",
                    multiplier: 1.2,
                    reason: "Tambah rasa coklat",
                },
            ],
            instruction_additions: &[
                "Tambahkan topping gula halus sebelum disajikan",
                "Bisa ditambah madu atau sirup maple",
            ],
        },
        VariationKind::Healthier => VariationRule {
            name_suffix: " Sehat",
            description: "Versi lebih sehat dengan pengurangan gula dan lemak",
            substitutions: &[
                Substitution {
                    pattern: "gula",
                    replacement: "gula stevia",
                    multiplier: 0.5,
                    reason: "Kurangi kalori",
                },
                Substitution {
                    pattern: "mentega",
                    replacement: "minyak kelapa",
                    multiplier: 0.7,
                    reason: "Lemak lebih sehat",
                },
                Substitution {
                    pattern: "tepung terigu",
                    replacement: "tepung gandum utuh",
                    multiplier: 1.0,
                    reason: "Lebih banyak serat",
                },
            ],
            instruction_additions: &[
                "Gunakan teknik panggang daripada goreng jika memungkinkan",
                "Tambahkan sayuran atau buah untuk nutrisi ekstra",
            ],
        },
        VariationKind::Budget => VariationRule {
            name_suffix: " Ekonomis",
            description: "Versi hemat dengan bahan yang lebih terjangkau",
            substitutions: &[
                Substitution {
                    pattern: "mentega",
                    replacement: "margarin",
                    multiplier: 1.0,
                    reason: "Lebih ekonomis",
                },
                Substitution {
                    pattern: "susu segar",
                    replacement: "susu bubuk",
                    multiplier: 0.8,
                    reason: "Lebih hemat",
                },
                Substitution {
                    pattern: "keju",
                    replacement: "keju cheddar lokal",
                    multiplier: 0.8,
                    reason: "Alternatif lebih murah",
                },
            ],
            instruction_additions: &[
                "Bisa menggunakan bahan substitusi yang lebih murah",
                "Buat dalam jumlah besar untuk efisiensi biaya",
            ],
        },
        VariationKind::Premium => VariationRule {
            name_suffix: " Premium",
            description: "Versi premium dengan bahan berkualitas tinggi",
            substitutions: &[
                Substitution {
                    pattern: "mentega",
                    replacement: "butter Anchor",
                    multiplier: 1.2,
                    reason: "Kualitas premium",
                },
                Substitution {
                    pattern: "coklat",
                    replacement: "coklat Belgia",
                    multiplier: 1.3,
                    reason: "Rasa lebih kaya",
                },
                Substitution {
                    pattern: "vanili",
                    replacement: "ekstrak vanili murni",
                    multiplier: 1.0,
                    reason: "Aroma lebih harum",
                },
            ],
            instruction_additions: &[
                "Gunakan bahan-bahan berkualitas premium untuk hasil terbaik",
                "Perhatikan detail presentasi untuk tampilan mewah",
            ],
        },
    }
}

/// Derive a variation: first matching substitution per ingredient, plus the
/// kind's extra instructions.
pub fn generate_variation(input: &VariationInput) -> RecipeVariation {
    let rule = variation_rule(input.variation_type);
    let ingredient_changes = input
        .base_recipe
        .ingredients
        .iter()
        .filter_map(|ingredient| {
            let lowered = ingredient.name.to_lowercase();
            rule.substitutions
                .iter()
                .find(|sub| lowered.contains(sub.pattern))
                .map(|sub| IngredientChange {
                    original: format!(
                        "{} {}{}",
                        ingredient.name,
                        format_quantity(ingredient.quantity),
                        ingredient.unit
                    ),
                    modified: format!(
                        "{} {}{}",
                        sub.replacement,
                        format_quantity((ingredient.quantity * sub.multiplier).round()),
                        ingredient.unit
                    ),
                    reason: sub.reason.to_string(),
                })
        })
        .collect();

    RecipeVariation {
        name: format!("{}{}", input.base_recipe.name, rule.name_suffix),
        description: rule.description.to_string(),
        ingredient_changes,
        instruction_changes: rule
            .instruction_additions
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}

fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        format!("{}", quantity as i64)
    } else {
        format!("{}", quantity)
    }
}

/// Lowercase ASCII alphanumerics and single spaces only
pub fn normalize_name(name: &str) -> String {
    let kept: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 1.0 for equal names, 0.9 when one contains the other, otherwise
/// 1 - levenshtein / max_len. A name that normalized to nothing matches
/// nothing.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(b) || b.contains(a) {
        return 0.9;
    }
    let max_len = a.chars().count().max(b.chars().count());
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = if ca == *cb { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b_chars.len()]
}
