//! CLI presentation: text and json formatters per command family.

mod batch;
mod progress;
mod recipe;
mod shared;

pub use batch::{format_batch_result_json, format_batch_result_text};
pub use progress::format_progress_line;
pub use recipe::{
    format_recipe_json, format_recipe_text, format_variation_json, format_variation_text,
};
pub use shared::format_config_validation;
