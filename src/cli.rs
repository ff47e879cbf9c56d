//! CLI domain: parse, route, and presentation only.
//! Domain logic lives in the orchestrator, batch, and worker modules; CLI delegates to them.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, ConfigCommands};
pub use route::RunContext;
