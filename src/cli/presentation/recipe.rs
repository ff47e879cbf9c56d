//! Recipe and variation presentation.

use crate::cli::presentation::shared::format_section_heading;
use crate::error::GenerationError;
use crate::types::{CostSummary, GeneratedRecipe, RecipeVariation};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

pub fn format_recipe_json(recipe: &GeneratedRecipe) -> Result<String, GenerationError> {
    Ok(serde_json::to_string_pretty(recipe)?)
}

pub fn format_recipe_text(recipe: &GeneratedRecipe) -> String {
    let mut out = format_section_heading(&recipe.name);
    if let Some(description) = &recipe.description {
        out.push_str(&format!("\n{}", description));
    }
    if let Some(servings) = recipe.servings {
        out.push_str(&format!("\nPorsi: {}", servings));
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Bahan", "Jumlah", "Satuan"]);
    for ingredient in &recipe.ingredients {
        table.add_row(vec![
            ingredient.name.clone(),
            format_quantity(ingredient.quantity),
            ingredient.unit.clone(),
        ]);
    }
    out.push_str(&format!("\n\n{}\n{}", format_section_heading("Bahan"), table));

    if !recipe.instructions.is_empty() {
        out.push_str(&format!("\n\n{}", format_section_heading("Langkah")));
        for step in &recipe.instructions {
            out.push_str(&format!("\n  {}. {}", step.step, step.title));
            if !step.description.is_empty() {
                out.push_str(&format!(": {}", step.description));
            }
        }
    }

    if let Some(hpp) = &recipe.hpp {
        out.push_str(&format!("\n\n{}\n{}", format_section_heading("HPP"), cost_table(hpp)));
    }
    out
}

fn cost_table(hpp: &CostSummary) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Komponen", "Rp"]);
    table.add_row(vec!["Bahan".to_string(), format_rupiah(hpp.total_material_cost)]);
    table.add_row(vec!["Operasional".to_string(), format_rupiah(hpp.operational_cost)]);
    table.add_row(vec!["Total HPP".to_string(), format_rupiah(hpp.total_hpp)]);
    table.add_row(vec!["HPP per porsi".to_string(), format_rupiah(hpp.hpp_per_unit)]);
    table.add_row(vec![
        "Harga rekomendasi".to_string(),
        format_rupiah(hpp.suggested_prices.recommended),
    ]);
    table
}

pub fn format_variation_json(variation: &RecipeVariation) -> Result<String, GenerationError> {
    Ok(serde_json::to_string_pretty(variation)?)
}

pub fn format_variation_text(variation: &RecipeVariation) -> String {
    let mut out = format_section_heading(&variation.name);
    out.push_str(&format!("\n{}", variation.description));
    if !variation.ingredient_changes.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Semula", "Menjadi", "Alasan"]);
        for change in &variation.ingredient_changes {
            table.add_row(vec![
                change.original.clone(),
                change.modified.clone(),
                change.reason.clone(),
            ]);
        }
        out.push_str(&format!("\n\n{}", table));
    }
    for change in &variation.instruction_changes {
        out.push_str(&format!("\n  - {}", change));
    }
    out
}

fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        format!("{}", quantity as i64)
    } else {
        format!("{:.2}", quantity)
    }
}

fn format_rupiah(amount: f64) -> String {
    format!("{:.0}", amount)
}
