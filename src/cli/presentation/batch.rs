//! Batch presentation: summary table and JSON result.

use crate::batch::BatchResult;
use crate::cli::presentation::shared::format_section_heading;
use crate::error::GenerationError;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

pub fn format_batch_result_json(result: &BatchResult) -> Result<String, GenerationError> {
    Ok(serde_json::to_string_pretty(result)?)
}

pub fn format_batch_result_text(result: &BatchResult) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Resep", "Status", "Keterangan"]);
    for recipe in &result.successful {
        let detail = match &recipe.hpp {
            Some(hpp) => format!("HPP/porsi {:.0}", hpp.hpp_per_unit),
            None => format!("{} bahan", recipe.ingredients.len()),
        };
        table.add_row(vec![recipe.name.clone(), "berhasil".to_string(), detail]);
    }
    for failed in &result.failed {
        table.add_row(vec![
            failed.request.name.clone(),
            "gagal".to_string(),
            failed.error.clone(),
        ]);
    }
    format!(
        "{}\n{}\n{} berhasil, {} gagal dari {}",
        format_section_heading("Batch"),
        table,
        result.successful.len(),
        result.failed.len(),
        result.total()
    )
}
