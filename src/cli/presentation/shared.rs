//! Shared presentation helpers.

use crate::config::ConfigValidationError;
use owo_colors::OwoColorize;

pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn format_config_validation(result: &Result<(), Vec<ConfigValidationError>>) -> String {
    match result {
        Ok(()) => "Configuration is valid".to_string(),
        Err(errors) => {
            let mut s = format!("Configuration has {} problem(s):", errors.len());
            for e in errors {
                s.push_str(&format!("\n  - {}", e));
            }
            s
        }
    }
}
