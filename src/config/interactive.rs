#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};
use std::path::{Path, PathBuf};

use super::{Config, ConfigError, ServerConfig};

#[inline]
pub fn run_interactive_config(path: Option<&Path>) -> Result<()> {
    println!("{}", style("🔧 Railway MCP Configuration Setup").bold().cyan());
    println!();

    let config_path = target_path(path)?;
    let mut config = load_existing_config(&config_path);

    println!("{}", style("Server Configuration").bold().yellow());
    println!("Configure where the MCP server listens for clients.");
    println!("The PORT environment variable still overrides the port at runtime.");
    println!();

    configure_server(&mut config.server)?;

    println!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config
            .save_to(&config_path)
            .context("Failed to save configuration")?;
        println!("{}", style("✓ Configuration saved successfully!").green());
        println!(
            "Configuration saved to: {}",
            style(config_path.display()).cyan()
        );
    } else {
        println!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(path: Option<&Path>) -> Result<()> {
    let config = Config::resolve(path).context("Failed to load configuration")?;

    println!("{}", style("📋 Current Configuration").bold().cyan());
    println!();

    println!("{}", style("Server Settings:").bold().yellow());
    println!("  Name: {}", style(&config.server.name).cyan());
    println!("  Host: {}", style(&config.server.host).cyan());
    println!("  Port: {}", style(config.server.port).cyan());
    println!("  Endpoint: {}", style(&config.server.endpoint_path).cyan());
    println!(
        "  Session idle timeout: {}s",
        style(config.server.session_idle_timeout_secs).cyan()
    );

    println!();
    match config.server.endpoint_url() {
        Ok(url) => println!("  MCP URL: {}", style(url).cyan()),
        Err(e) => println!("  MCP URL: {} ({})", style("Invalid").red(), e),
    }

    let config_path = target_path(path)?;
    println!();
    if config_path.exists() {
        println!("Config file: {}", style(config_path.display()).dim());
    } else {
        println!(
            "Config file: {} {}",
            style(config_path.display()).dim(),
            style("(not present, using defaults)").dim()
        );
    }

    Ok(())
}

fn target_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::config_file_path().context("Failed to get config file path"),
    }
}

fn load_existing_config(config_path: &Path) -> Config {
    if !config_path.exists() {
        println!(
            "{}",
            style("No existing configuration found. Using defaults.").yellow()
        );
        return Config::default();
    }

    Config::load_from(config_path).map_or_else(
        |e| {
            println!(
                "{} {:#}",
                style("Existing configuration is unreadable, using defaults:").yellow(),
                e
            );
            Config::default()
        },
        |config| {
            println!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

fn configure_server(server: &mut ServerConfig) -> Result<()> {
    let host: String = Input::new()
        .with_prompt("Listen host")
        .default(server.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            ServerConfig::default().set_host(input.clone())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Listen port")
        .default(server.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let endpoint_path: String = Input::new()
        .with_prompt("MCP endpoint path")
        .default(server.endpoint_path.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            ServerConfig::default().set_endpoint_path(input.clone())
        })
        .interact_text()?;

    server.set_host(host)?;
    server.set_port(port)?;
    server.set_endpoint_path(endpoint_path)?;

    Ok(())
}
