//! Endpoints Command
//!
//! Lists the protocol endpoints known for a storage host.

use anyhow::{Context, Result};
use console::style;
use gridlink_network::{EndpointService, ProtocolFilter, ProtocolVersion};

/// Endpoints configuration
pub struct EndpointsConfig {
    pub host: String,
    pub version: Option<ProtocolVersion>,
    /// Print the legacy type/url lists
    pub types: bool,
}

/// Run endpoints command
pub fn run(service: &EndpointService, config: EndpointsConfig) -> Result<()> {
    if config.types {
        let (types, urls) = service
            .types_and_endpoints(&config.host)
            .with_context(|| format!("Endpoint lookup failed for {}", config.host))?;
        for (kind, url) in types.iter().zip(&urls) {
            println!("{}\t{}", kind, url);
        }
        return Ok(());
    }

    let filter = match config.version {
        Some(version) => ProtocolFilter::Only(version),
        None => ProtocolFilter::Any,
    };
    let endpoints = service
        .resolve_endpoints(&config.host, filter)
        .with_context(|| format!("Endpoint lookup failed for {}", config.host))?;

    if endpoints.is_empty() {
        println!("{}", style(format!("No endpoints for {}", config.host)).yellow());
        return Ok(());
    }

    for endpoint in endpoints {
        println!(
            "{:<8} {}",
            style(endpoint.protocol_version).cyan(),
            endpoint.url
        );
    }
    Ok(())
}

/// Parse a `--version` argument
pub fn parse_version(raw: &str) -> Result<ProtocolVersion, String> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "v1" | "srm_v1" => Ok(ProtocolVersion::V1),
        "2" | "v2" | "srm_v2" => Ok(ProtocolVersion::V2),
        other => Err(format!("unknown protocol version: {}", other)),
    }
}
