//! Config Command
//!
//! Shows or checks the effective configuration.

use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use gridlink_core::GridConfig;
use std::path::Path;

/// Print the effective configuration as TOML
pub fn show(config: &GridConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}

/// Load and validate a configuration file
pub fn check(path: &Path) -> Result<()> {
    GridConfig::from_file(path)
        .with_context(|| format!("{} {}", symbols::CROSS, path.display()))?;
    println!("{} {} is valid", style(symbols::CHECK).green(), path.display());
    Ok(())
}
