// Configuration management module
// TOML settings file, validation, and the interactive `config` command

pub mod interactive;
pub mod settings;

#[cfg(test)]
mod tests;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{Config, ConfigError, ServerConfig};

