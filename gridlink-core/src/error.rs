//! Error types for GridLink
//!
//! Leaf errors shared by every crate in the workspace. Operation-level errors
//! (registration, discovery, resolution) live next to their operations and
//! classify themselves with [`ErrorKind`].

use thiserror::Error;

/// Coarse classification shared by every operation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input, never retried
    InvalidUrl,
    /// Target does not exist
    NotFound,
    /// Physical replica and catalog metadata disagree
    Inconsistent,
    /// Target already exists
    AlreadyExists,
    /// Discovery service or endpoint cache failure
    Discovery,
    /// Catalog backend failure
    Catalog,
    /// Storage metadata query failure
    Stat,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUrl => write!(f, "invalid url"),
            Self::NotFound => write!(f, "not found"),
            Self::Inconsistent => write!(f, "inconsistent"),
            Self::AlreadyExists => write!(f, "already exists"),
            Self::Discovery => write!(f, "discovery"),
            Self::Catalog => write!(f, "catalog"),
            Self::Stat => write!(f, "stat"),
        }
    }
}

/// URL parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("Malformed url {url}: {reason}")]
    Malformed { url: String, reason: String },

    #[error("Url has no host: {0}")]
    MissingHost(String),

    #[error("Url has no path: {0}")]
    MissingPath(String),
}

/// Errors reported by the storage metadata and checksum services.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("No such file: {0}")]
    NotFound(String),

    #[error("Storage error {code}: {message}")]
    Backend { code: i32, message: String },
}

impl StorageError {
    pub fn backend(code: i32, message: impl Into<String>) -> Self {
        Self::Backend {
            code,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Backend { .. } => ErrorKind::Stat,
        }
    }
}

/// Errors reported by a catalog backend.
///
/// "Not found" and "already exists" are distinguished from every other
/// failure; the registration protocol branches on both.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("No such catalog entry: {0}")]
    NotFound(String),

    #[error("Catalog entry already exists: {0}")]
    AlreadyExists(String),

    #[error("Catalog error {code}: {message}")]
    Backend { code: i32, message: String },
}

impl CatalogError {
    pub fn backend(code: i32, message: impl Into<String>) -> Self {
        Self::Backend {
            code,
            message: message.into(),
        }
    }

    /// Numeric code attached to the error, errno style
    pub fn code(&self) -> i32 {
        match self {
            Self::NotFound(_) => 2,
            Self::AlreadyExists(_) => 17,
            Self::Backend { code, .. } => *code,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::Backend { .. } => ErrorKind::Catalog,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CatalogError::backend(13, "permission denied");
        assert_eq!(err.to_string(), "Catalog error 13: permission denied");
    }

    #[test]
    fn test_catalog_error_codes() {
        assert_eq!(CatalogError::NotFound("/a".into()).code(), 2);
        assert_eq!(CatalogError::AlreadyExists("/a".into()).code(), 17);
        assert_eq!(CatalogError::backend(5, "io").code(), 5);
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            CatalogError::NotFound("/a".into()).kind(),
            ErrorKind::NotFound
        );
        assert!(CatalogError::AlreadyExists("/a".into()).is_already_exists());
        assert_eq!(StorageError::backend(1, "x").kind(), ErrorKind::Stat);
        assert_eq!(
            StorageError::NotFound("srm://h/f".into()).kind(),
            ErrorKind::NotFound
        );
    }
}
