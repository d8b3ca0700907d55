//! Storage and catalog location helpers

use crate::error::UrlError;
use url::Url;

/// Parse a URL, mapping parser failures to [`UrlError`]
pub fn parse(raw: &str) -> Result<Url, UrlError> {
    Url::parse(raw).map_err(|e| UrlError::Malformed {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Host part of a storage URL.
///
/// The URL must carry a scheme, a host and a non-empty path, as in
/// `srm://storage.example.org:8443/data/file`.
pub fn storage_host(raw: &str) -> Result<String, UrlError> {
    let url = parse(raw)?;
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| UrlError::MissingHost(raw.to_string()))?;
    if url.path().trim_start_matches('/').is_empty() {
        return Err(UrlError::MissingPath(raw.to_string()));
    }
    Ok(host.to_string())
}

/// A catalog location split into the catalog host and the logical path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLocation {
    pub host: String,
    pub path: String,
}

impl CatalogLocation {
    /// Split `scheme://host[:port]/logical/path`.
    ///
    /// The host keeps its port, if any; the path is percent-decoded and
    /// never ends with a slash.
    pub fn parse(raw: &str) -> Result<Self, UrlError> {
        let url = parse(raw)?;
        let host = match (url.host_str(), url.port()) {
            (Some(h), Some(port)) if !h.is_empty() => format!("{}:{}", h, port),
            (Some(h), None) if !h.is_empty() => h.to_string(),
            _ => return Err(UrlError::MissingHost(raw.to_string())),
        };

        let path = percent_decode(url.path());
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            return Err(UrlError::MissingPath(raw.to_string()));
        }

        Ok(Self {
            host,
            path: path.to_string(),
        })
    }

    /// Parent directory of the logical path, `None` for top-level entries
    pub fn parent(&self) -> Option<&str> {
        parent_dir(&self.path)
    }
}

/// Parent directory of an absolute catalog path.
///
/// Returns `None` when the parent is the root.
pub fn parent_dir(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => None,
        Some(idx) => Some(&trimmed[..idx]),
    }
}

fn percent_decode(path: &str) -> String {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => path.to_string(),
    }
}
