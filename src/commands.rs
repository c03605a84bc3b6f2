use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::capabilities::build_server;
use crate::config::{Config, run_interactive_config, show_config};
use crate::mcp::{McpServer, http};
use crate::{RailwayError, Result};

/// Transport the MCP server speaks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Transport {
    /// Streamable HTTP on the configured host and port
    #[default]
    Http,
    /// Newline-delimited JSON-RPC over stdin/stdout
    Stdio,
}

/// Options collected from the `serve` command line
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    pub transport: Transport,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
}

/// Resolve the effective configuration for `serve`
///
/// Command-line values win over the config file, which wins over defaults.
/// The `PORT` environment variable arrives through `options.port`.
#[inline]
pub fn resolve_config(options: &ServeOptions) -> Result<Config> {
    let mut config = Config::resolve(options.config.as_deref())
        .map_err(|e| RailwayError::Config(format!("{:#}", e)))?;

    config
        .server
        .apply_overrides(options.host.clone(), options.port)
        .map_err(|e| RailwayError::Config(e.to_string()))?;

    Ok(config)
}

/// Start the MCP server on the selected transport
#[inline]
pub async fn serve_mcp(options: &ServeOptions) -> Result<()> {
    let config = resolve_config(options)?;

    let server = Arc::new(
        build_server(&config.server).map_err(|e| RailwayError::Mcp(format!("{:#}", e)))?,
    );

    let statistics = server.server_statistics().await;
    info!(
        "{} {} ready: tools [{}], resource templates [{}], prompts [{}]",
        statistics.server_info.name,
        statistics.server_info.version,
        statistics.registered_tools.join(", "),
        statistics.registered_resource_templates.join(", "),
        statistics.registered_prompts.join(", ")
    );

    match options.transport {
        Transport::Http => serve_over_http(server, &config).await,
        Transport::Stdio => serve_over_stdio(server).await,
    }
}

async fn serve_over_http(server: Arc<McpServer>, config: &Config) -> Result<()> {
    match config.server.endpoint_url() {
        Ok(url) => eprintln!("🌐 Starting MCP server at {}", style(url).cyan()),
        Err(e) => warn!("Could not build endpoint URL: {}", e),
    }
    eprintln!("Press Ctrl+C to stop the server");

    http::serve_http(server, &config.server, shutdown_signal())
        .await
        .map_err(|e| RailwayError::Transport(format!("{:#}", e)))?;

    eprintln!("✅ Shutdown complete");
    Ok(())
}

async fn serve_over_stdio(server: Arc<McpServer>) -> Result<()> {
    // stdout carries protocol frames, so status goes to stderr only
    eprintln!("🌐 Starting MCP server on stdio transport...");

    tokio::select! {
        result = server.serve_stdio() => {
            result.map_err(|e| {
                error!("MCP server error: {:#}", e);
                RailwayError::Transport(format!("{:#}", e))
            })?;
        }
        () = shutdown_signal() => {
            eprintln!("\n📴 Received interrupt signal, shutting down...");
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM where available
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("Shutdown signal received");
}

/// Show the effective configuration, or walk through creating one
#[inline]
pub fn configure(init: bool, config: Option<&Path>) -> Result<()> {
    let outcome = if init {
        run_interactive_config(config)
    } else {
        show_config(config)
    };

    outcome.map_err(|e| RailwayError::Config(format!("{:#}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_config_file_or_overrides() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "").expect("should write config file");

        let options = ServeOptions {
            config: Some(config_path),
            ..ServeOptions::default()
        };

        let config = resolve_config(&options).expect("config resolves");
        assert_eq!(config, Config::default());
        assert_eq!(config.server.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn overrides_beat_config_file() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[server]\nhost = \"127.0.0.1\"\nport = 3000\n")
            .expect("should write config file");

        let from_file = resolve_config(&ServeOptions {
            config: Some(config_path.clone()),
            ..ServeOptions::default()
        })
        .expect("config resolves");
        assert_eq!(from_file.server.bind_address(), "127.0.0.1:3000");

        let overridden = resolve_config(&ServeOptions {
            transport: Transport::Http,
            host: Some("localhost".to_string()),
            port: Some(9999),
            config: Some(config_path),
        })
        .expect("config resolves");
        assert_eq!(overridden.server.bind_address(), "localhost:9999");
    }

    #[test]
    fn missing_explicit_config_file_is_an_error() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let options = ServeOptions {
            config: Some(temp_dir.path().join("absent.toml")),
            ..ServeOptions::default()
        };

        assert!(matches!(
            resolve_config(&options),
            Err(RailwayError::Config(_))
        ));
    }

    #[test]
    fn invalid_override_is_a_config_error() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "").expect("should write config file");

        let options = ServeOptions {
            port: Some(0),
            config: Some(config_path),
            ..ServeOptions::default()
        };

        assert!(matches!(
            resolve_config(&options),
            Err(RailwayError::Config(_))
        ));
    }
}
