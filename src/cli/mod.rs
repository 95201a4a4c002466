//! CLI command handling module
//!
//! Handles all CLI subcommands and argument parsing.

mod commands;
mod logging;
mod resolve;
mod version;

pub use commands::{ConfigSubcommand, handle_config_command};
pub use logging::init_logging;
pub use resolve::{OutputFormat, Session, resolve, resolve_pod, start_key};
pub use version::display_version;
