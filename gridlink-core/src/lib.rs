//! GridLink Core Library
//!
//! Shared building blocks for the GridLink data-access core:
//! - Error taxonomy shared by discovery, resolution and catalog operations
//! - Checksum types understood by the replica catalog
//! - Storage and catalog URL helpers
//! - TOML/environment configuration

pub mod checksum;
pub mod config;
pub mod error;
pub mod location;

pub use checksum::{Checksum, ChecksumType, MAX_CHECKSUM_LEN};
pub use config::{
    CacheSettings, CatalogSettings, ConfigError, DiscoverySettings, EnvSource, GridConfig,
    ProcessEnv, StaticEndpoint, INFOSYS_ENV, MAX_ENDPOINTS,
};
pub use error::{CatalogError, ErrorKind, StorageError, UrlError};
pub use location::CatalogLocation;

/// Longest endpoint URL accepted from discovery
pub const MAX_URL_LEN: usize = 2048;
