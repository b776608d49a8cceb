// erasure/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use erasure_core::infrastructure::config::app::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(name = "erasure")]
#[command(about = "Catalog-driven anonymization and tokenization remediation", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🌐 Serves the action API the catalog calls (/api/execute, /api/manifest, ...)
    Serve {
        /// YAML configuration file
        #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Overrides `server.host`
        #[arg(long)]
        host: Option<String>,

        /// Overrides `server.port`
        #[arg(long)]
        port: Option<u16>,
    },

    /// ⚡ Runs one action from a JSON trigger file ("-" reads stdin) and prints the result
    Execute {
        /// YAML configuration file
        #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Trigger body, as POSTed to /api/execute
        #[arg(long, short)]
        request: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use clap::Parser;

    #[test]
    fn test_cli_parse_serve_defaults() -> Result<()> {
        let args = Cli::parse_from(["erasure", "serve"]);
        match args.command {
            Commands::Serve { config, host, port } => {
                assert_eq!(config.to_string_lossy(), "erasure.yaml");
                assert_eq!(host, None);
                assert_eq!(port, None);
                Ok(())
            }
            _ => bail!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_serve_overrides() -> Result<()> {
        let args = Cli::parse_from([
            "erasure",
            "serve",
            "--config",
            "/etc/erasure.yaml",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
        ]);
        match args.command {
            Commands::Serve { config, host, port } => {
                assert_eq!(config.to_string_lossy(), "/etc/erasure.yaml");
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
                assert_eq!(port, Some(8080));
                Ok(())
            }
            _ => bail!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_execute() -> Result<()> {
        let args = Cli::parse_from(["erasure", "execute", "-r", "trigger.json"]);
        match args.command {
            Commands::Execute { request, config } => {
                assert_eq!(request.to_string_lossy(), "trigger.json");
                assert_eq!(config.to_string_lossy(), "erasure.yaml");
                Ok(())
            }
            _ => bail!("Expected Execute command"),
        }
    }

    #[test]
    fn test_cli_execute_requires_request() {
        assert!(Cli::try_parse_from(["erasure", "execute"]).is_err());
    }
}
