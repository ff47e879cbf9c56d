//! CLI output: error mapping from domain errors to the CLI surface.

use crate::error::GenerationError;

/// Map a domain error to the text printed on stderr.
pub fn map_error(e: &GenerationError) -> String {
    match e {
        GenerationError::Unauthenticated => {
            "Caller is not authenticated: set session.user_id in config or pass --user-id"
                .to_string()
        }
        GenerationError::Validation(problems) => {
            let mut out = String::from("Invalid generation request:");
            for problem in problems {
                out.push_str(&format!("\n  - {}", problem));
            }
            out
        }
        other => other.to_string(),
    }
}
