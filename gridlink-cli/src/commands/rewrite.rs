//! Rewrite Command
//!
//! Substitutes the resolved node into storage URLs.

use crate::symbols;
use anyhow::{bail, Result};
use console::style;
use gridlink_network::{NameService, UriRewriter};

/// Rewrite configuration
pub struct RewriteConfig {
    pub urls: Vec<String>,
    /// Print the original url instead of failing
    pub best_effort: bool,
}

/// Run rewrite command
pub fn run<N: NameService>(rewriter: &UriRewriter<N>, config: RewriteConfig) -> Result<()> {
    let mut failures = 0;

    for url in &config.urls {
        if config.best_effort {
            println!("{}", rewriter.rewrite_or_original(url, "rewrite"));
            continue;
        }

        match rewriter.rewrite_host(url) {
            Ok(rewritten) => println!("{} {} {}", url, symbols::ARROW, style(rewritten).green()),
            Err(e) => {
                failures += 1;
                eprintln!("{} {}: {}", style(symbols::CROSS).red(), url, e);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} urls could not be rewritten", failures, config.urls.len());
    }
    Ok(())
}
