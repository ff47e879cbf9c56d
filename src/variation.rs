//! Best-effort recipe variations.
//!
//! Runs independently of the generation pipeline: it neither touches progress
//! nor the single-flight slot. Worker problems are logged and yield `None`.

use tracing::{debug, warn};

use crate::types::{AvailableIngredient, GeneratedRecipe, RecipeVariation, VariationKind};
use crate::worker::{PricedIngredient, VariationBase, VariationInput, WorkerChannel};

/// Build the worker payload for a variation of `recipe`
pub fn variation_input(
    recipe: &GeneratedRecipe,
    kind: VariationKind,
    available: &[AvailableIngredient],
) -> VariationInput {
    VariationInput {
        base_recipe: VariationBase {
            name: recipe.name.clone(),
            ingredients: recipe.ingredients.clone(),
            instructions: recipe.instructions.clone(),
        },
        variation_type: kind,
        available_ingredients: available
            .iter()
            .map(|ingredient| PricedIngredient {
                name: ingredient.name.clone(),
                price_per_unit: ingredient.price_per_unit,
            })
            .collect(),
    }
}

/// Ask the worker for a variation of `recipe`. Returns `None` when the
/// worker is unavailable or the task fails.
pub async fn generate_variation(
    worker: &WorkerChannel,
    recipe: &GeneratedRecipe,
    kind: VariationKind,
    available: &[AvailableIngredient],
) -> Option<RecipeVariation> {
    let input = variation_input(recipe, kind, available);
    match worker.generate_variation(&input, None).await {
        Ok(variation) => {
            debug!(
                recipe = %recipe.name,
                kind = %kind,
                changes = variation.ingredient_changes.len(),
                "Generated recipe variation"
            );
            Some(variation)
        }
        Err(err) => {
            warn!(recipe = %recipe.name, kind = %kind, error = %err, "Variation generation failed");
            None
        }
    }
}
