//! CLI command handlers, one file per command.

mod check_config;
mod completions;
mod request;
mod serve;

pub use check_config::run_check_config;
pub use completions::run_completions;
pub use request::run_request;
pub use serve::run_serve;
