//! Resolve Command
//!
//! Resolves a DNS alias one or more times and shows which nodes were picked.

use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use gridlink_network::{HostnameResolver, NameService};
use std::collections::BTreeMap;

/// Resolve configuration
pub struct ResolveConfig {
    pub alias: String,
    pub count: usize,
}

/// Run resolve command
pub fn run<N: NameService>(resolver: &HostnameResolver<N>, config: ResolveConfig) -> Result<()> {
    let picks = resolve_many(resolver, &config.alias, config.count.max(1))?;

    if picks.len() == 1 {
        println!(
            "{} {} {}",
            config.alias,
            symbols::ARROW,
            style(&picks[0]).green()
        );
        return Ok(());
    }

    println!(
        "{}",
        style(format!("{} ({} resolutions)", config.alias, picks.len())).bold()
    );
    for (host, hits) in tally(&picks) {
        println!("  {:<40} {:>6}", host, hits);
    }
    Ok(())
}

fn resolve_many<N: NameService>(
    resolver: &HostnameResolver<N>,
    alias: &str,
    count: usize,
) -> Result<Vec<String>> {
    (0..count)
        .map(|_| {
            resolver
                .resolve(alias)
                .with_context(|| format!("{} Could not resolve {}", symbols::CROSS, alias))
        })
        .collect()
}

/// Count how often each host was selected
fn tally(picks: &[String]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for pick in picks {
        *counts.entry(pick.as_str()).or_insert(0) += 1;
    }
    counts
}
