//! GridLink CLI
//!
//! Diagnostic client for the GridLink name resolution and endpoint
//! discovery layer.
//!
//! # Commands
//! - `resolve` - Resolve a DNS alias to one of its nodes
//! - `rewrite` - Substitute the resolved node into storage URLs
//! - `endpoints` - List the protocol endpoints of a storage host
//! - `config` - Show or check configuration
//!
//! # Configuration
//! Config file: `gridlink.toml` in the working directory, or `--config`.
//! Endpoints are served from `[[discovery.static_endpoints]]`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gridlink_core::GridConfig;
use gridlink_network::{EndpointService, HostnameResolver, ProtocolVersion, UriRewriter};
use std::path::{Path, PathBuf};

mod commands;
mod symbols;

use commands::{config, endpoints, resolve, rewrite};

#[derive(Parser)]
#[command(name = "gridlink")]
#[command(about = "GridLink name resolution and endpoint discovery tool")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "GRIDLINK_CONFIG",
        default_value = "gridlink.toml"
    )]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a DNS alias to one concrete host
    Resolve {
        /// DNS alias
        alias: String,

        /// Number of resolutions (shows the selection spread)
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Rewrite storage URLs onto resolved hosts
    Rewrite {
        /// URLs to rewrite
        #[arg(required = true)]
        urls: Vec<String>,

        /// Print the original URL when rewriting fails
        #[arg(long)]
        best_effort: bool,
    },

    /// List endpoints of a storage host
    Endpoints {
        /// Storage host
        host: String,

        /// Only show endpoints of this protocol version (v1, v2)
        #[arg(long, value_parser = endpoints::parse_version)]
        version: Option<ProtocolVersion>,

        /// Print type tags and urls as tab-separated pairs
        #[arg(long)]
        types: bool,
    },

    /// Show or check configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show effective configuration
    Show,

    /// Validate the configuration file
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cfg = load_config(&cli.config);

    match cli.command {
        Commands::Resolve { alias, count } => {
            let resolver = HostnameResolver::system().context("Name service unavailable")?;
            resolve::run(&resolver, resolve::ResolveConfig { alias, count })?;
        }

        Commands::Rewrite { urls, best_effort } => {
            let resolver = HostnameResolver::system().context("Name service unavailable")?;
            let rewriter = UriRewriter::new(resolver);
            rewrite::run(&rewriter, rewrite::RewriteConfig { urls, best_effort })?;
        }

        Commands::Endpoints {
            host,
            version,
            types,
        } => {
            let service = EndpointService::from_config(&cfg, None);
            endpoints::run(
                &service,
                endpoints::EndpointsConfig {
                    host,
                    version,
                    types,
                },
            )?;
        }

        Commands::Config { command } => match command {
            None | Some(ConfigCommands::Show) => config::show(&cfg)?,
            Some(ConfigCommands::Check) => config::check(&cli.config)?,
        },
    }

    Ok(())
}

/// Load the config file if present, then apply environment overrides
fn load_config(path: &Path) -> GridConfig {
    let cfg = if path.exists() {
        GridConfig::load_or_default(path)
    } else {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        GridConfig::default()
    };
    cfg.with_env_overrides()
}
