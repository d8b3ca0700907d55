//! Storage URL host rewriting
//!
//! Replaces the DNS alias in a storage URL with the concrete host chosen by
//! [`HostnameResolver`], leaving everything else in the URL as it was.

use crate::resolver::{HostnameResolver, NameService, ResolveError};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Rewrite errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("Invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error(transparent)]
    NotFound(#[from] ResolveError),
}

impl RewriteError {
    pub fn kind(&self) -> gridlink_core::ErrorKind {
        match self {
            Self::InvalidUrl { .. } => gridlink_core::ErrorKind::InvalidUrl,
            Self::NotFound(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RewriteError>;

/// Rewrites storage URLs onto resolved hosts
pub struct UriRewriter<N: NameService> {
    resolver: HostnameResolver<N>,
}

impl<N: NameService> UriRewriter<N> {
    pub fn new(resolver: HostnameResolver<N>) -> Self {
        Self { resolver }
    }

    /// Substitute the host of `uri` with one resolved hostname.
    ///
    /// Scheme, port, path, query and fragment are kept as they are.
    pub fn rewrite_host(&self, uri: &str) -> Result<String> {
        let mut parsed = Url::parse(uri).map_err(|e| RewriteError::InvalidUrl {
            url: uri.to_string(),
            reason: e.to_string(),
        })?;

        let alias = match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => {
                return Err(RewriteError::InvalidUrl {
                    url: uri.to_string(),
                    reason: "no host".to_string(),
                })
            }
        };

        let hostname = self.resolver.resolve(&alias)?;
        parsed
            .set_host(Some(&hostname))
            .map_err(|e| RewriteError::InvalidUrl {
                url: uri.to_string(),
                reason: format!("cannot set host {}: {}", hostname, e),
            })?;

        debug!(alias = %alias, hostname = %hostname, "Rewrote url host");
        Ok(parsed.to_string())
    }

    /// Best-effort variant of [`rewrite_host`](Self::rewrite_host).
    ///
    /// Returns the original URL on any failure.
    pub fn rewrite_or_original(&self, uri: &str, context: &str) -> String {
        match self.rewrite_host(uri) {
            Ok(rewritten) => {
                info!("{}: {} => {}", context, uri, rewritten);
                rewritten
            }
            Err(e) => {
                warn!(context = %context, url = %uri, error = %e, "Keeping original url");
                uri.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::testing::StaticNames;

    fn rewriter() -> UriRewriter<StaticNames> {
        let names = StaticNames::default()
            .with_alias("se.example.org", &[("10.0.0.1", "node1.example.org")])
            .with_alias("bare.example.org", &[("10.9.9.9", "")]);
        UriRewriter::new(HostnameResolver::with_seed(names, 1))
    }

    #[test]
    fn test_rewrite_keeps_other_components() {
        let out = rewriter()
            .rewrite_host("srm://se.example.org:8446/srm/managerv2?SFN=/data/f#frag")
            .unwrap();
        assert_eq!(
            out,
            "srm://node1.example.org:8446/srm/managerv2?SFN=/data/f#frag"
        );
    }

    #[test]
    fn test_rewrite_special_scheme() {
        let out = rewriter()
            .rewrite_host("https://se.example.org/data/x.dat")
            .unwrap();
        assert_eq!(out, "https://node1.example.org/data/x.dat");
    }

    #[test]
    fn test_rewrite_invalid_url() {
        let err = rewriter().rewrite_host("not a url").unwrap_err();
        assert_eq!(err.kind(), gridlink_core::ErrorKind::InvalidUrl);
    }

    #[test]
    fn test_rewrite_without_host() {
        let err = rewriter().rewrite_host("file:///tmp/x").unwrap_err();
        assert!(matches!(err, RewriteError::InvalidUrl { .. }));
    }

    #[test]
    fn test_rewrite_unresolvable_host() {
        let err = rewriter()
            .rewrite_host("gsiftp://bare.example.org/f")
            .unwrap_err();
        assert_eq!(err.kind(), gridlink_core::ErrorKind::NotFound);
    }

    #[test]
    fn test_rewrite_or_original_falls_back() {
        let uri = "gsiftp://unknown.example.org/f";
        assert_eq!(rewriter().rewrite_or_original(uri, "transfer"), uri);
    }

    #[test]
    fn test_rewrite_or_original_rewrites() {
        let out = rewriter().rewrite_or_original("gsiftp://se.example.org/f", "transfer");
        assert_eq!(out, "gsiftp://node1.example.org/f");
    }
}
