use clap::{Parser, Subcommand};
use railway_mcp::Result;
use railway_mcp::commands::{ServeOptions, Transport, configure, serve_mcp};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "railway-mcp")]
#[command(about = "Demo MCP server with toy tools, a greeting resource and a question prompt")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server
    Serve {
        /// Transport to serve MCP over
        #[arg(long, value_enum, default_value_t = Transport::Http)]
        transport: Transport,
        /// Host to bind the HTTP listener to
        #[arg(long)]
        host: Option<String>,
        /// Port to bind the HTTP listener to
        #[arg(long, env = "PORT")]
        port: Option<u16>,
        /// Path to a config file (defaults to ~/.railway-mcp/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show the current configuration
    Config {
        /// Interactively create or update the config file
        #[arg(long)]
        init: bool,
        /// Path to a config file (defaults to ~/.railway-mcp/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout belongs to the stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            transport,
            host,
            port,
            config,
        } => {
            serve_mcp(&ServeOptions {
                transport,
                host,
                port,
                config,
            })
            .await?;
        }
        Commands::Config { init, config } => {
            configure(init, config.as_deref())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn serve_command_defaults_to_http() {
        let cli = Cli::try_parse_from(["railway-mcp", "serve"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Serve {
                transport, host, ..
            } = parsed.command
            {
                assert_eq!(transport, Transport::Http);
                assert_eq!(host, None);
            } else {
                panic!("expected serve command");
            }
        }
    }

    #[test]
    fn serve_command_with_options() {
        let cli = Cli::try_parse_from([
            "railway-mcp",
            "serve",
            "--transport",
            "stdio",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--config",
            "/tmp/railway.toml",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Serve {
                transport,
                host,
                port,
                config,
            } = parsed.command
            {
                assert_eq!(transport, Transport::Stdio);
                assert_eq!(host, Some("127.0.0.1".to_string()));
                assert_eq!(port, Some(9000));
                assert_eq!(config, Some(PathBuf::from("/tmp/railway.toml")));
            } else {
                panic!("expected serve command");
            }
        }
    }

    #[test]
    fn invalid_port_is_rejected() {
        let cli = Cli::try_parse_from(["railway-mcp", "serve", "--port", "70000"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn invalid_transport_is_rejected() {
        let cli = Cli::try_parse_from(["railway-mcp", "serve", "--transport", "sse"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidValue);
        }
    }

    #[test]
    fn config_init_flag() {
        let cli = Cli::try_parse_from(["railway-mcp", "config", "--init"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { init, config } = parsed.command {
                assert!(init);
                assert_eq!(config, None);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["railway-mcp", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["railway-mcp", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
