//! Storage endpoint discovery
//!
//! Maps a storage host to the protocol endpoints it exposes. The
//! [`EndpointService`] answers from the [`EndpointCache`] when it can and
//! falls back to the [`EndpointResolver`], which queries either an external
//! discovery service or a static table from configuration.

use crate::cache::{CacheLookup, EndpointCache, MemoryEndpointCache};
use gridlink_core::config::{DiscoverySettings, EnvSource, GridConfig, ProcessEnv};
use gridlink_core::{ErrorKind, INFOSYS_ENV, MAX_URL_LEN};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Type tag of version 2 endpoints
pub const SRM_V2_TAG: &str = "srm_v2";

/// Type tag of version 1 endpoints
pub const SRM_V1_TAG: &str = "srm_v1";

/// Discovery errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("Endpoint discovery is disabled")]
    Disabled,

    #[error("No discovery service configured (set LCG_GFAL_INFOSYS or discovery.infosys)")]
    NotConfigured,

    #[error("Endpoint cache error: {0}")]
    Cache(String),

    #[error("Malformed discovery response for {host}: {reason}")]
    Malformed { host: String, reason: String },

    #[error("Discovery service error: {0}")]
    Backend(String),

    #[error("No endpoints found for host {0}")]
    NoEndpoints(String),
}

impl DiscoveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoEndpoints(_) => ErrorKind::NotFound,
            _ => ErrorKind::Discovery,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Storage protocol generation of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    V1,
    V2,
}

impl ProtocolVersion {
    /// Classify a discovery type tag; only `srm_v2` maps to V2
    pub fn from_type_tag(tag: &str) -> Self {
        if tag == SRM_V2_TAG {
            Self::V2
        } else {
            Self::V1
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::V1 => SRM_V1_TAG,
            Self::V2 => SRM_V2_TAG,
        }
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_tag())
    }
}

/// Classified endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub url: String,
    pub protocol_version: ProtocolVersion,
}

impl EndpointDescriptor {
    pub fn new(url: impl Into<String>, protocol_version: ProtocolVersion) -> Self {
        Self {
            url: url.into(),
            protocol_version,
        }
    }
}

/// Raw endpoint as reported by a discovery source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredEndpoint {
    pub url: String,
    pub endpoint_type: String,
}

impl DiscoveredEndpoint {
    pub fn new(url: impl Into<String>, endpoint_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            endpoint_type: endpoint_type.into(),
        }
    }
}

/// Discovery service address and query timeout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryTarget {
    pub base_url: String,
    pub timeout: Duration,
}

/// Client for an external discovery service.
///
/// Implementations block until the service answers or `target.timeout`
/// elapses. An empty result is valid.
#[cfg_attr(test, mockall::automock)]
pub trait DiscoveryClient: Send + Sync {
    fn query(
        &self,
        target: &DiscoveryTarget,
        host: &str,
        max: usize,
    ) -> Result<Vec<DiscoveredEndpoint>>;
}

/// Offline endpoint table
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    table: HashMap<String, Vec<DiscoveredEndpoint>>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from `[[discovery.static_endpoints]]`
    pub fn from_settings(settings: &DiscoverySettings) -> Self {
        let mut table = Self::new();
        for entry in &settings.static_endpoints {
            table.insert(&entry.host, DiscoveredEndpoint::new(&entry.url, &entry.endpoint_type));
        }
        table
    }

    pub fn insert(&mut self, host: &str, endpoint: DiscoveredEndpoint) {
        self.table.entry(host.to_string()).or_default().push(endpoint);
    }

    pub fn query(&self, host: &str, max: usize) -> Vec<DiscoveredEndpoint> {
        self.table
            .get(host)
            .map(|endpoints| endpoints.iter().take(max).cloned().collect())
            .unwrap_or_default()
    }
}

/// Where cache misses are answered from
#[derive(Clone)]
pub enum DiscoveryBackend {
    External(Arc<dyn DiscoveryClient>),
    Static(StaticDiscovery),
}

/// Fills endpoint cache misses
pub struct EndpointResolver {
    backend: DiscoveryBackend,
    settings: DiscoverySettings,
    env: Arc<dyn EnvSource>,
    /// Set on first external query
    target: OnceLock<DiscoveryTarget>,
    /// Held only while `target` is being initialized
    init: Mutex<()>,
}

impl EndpointResolver {
    pub fn new(backend: DiscoveryBackend, settings: DiscoverySettings) -> Self {
        Self {
            backend,
            settings,
            env: Arc::new(ProcessEnv),
            target: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// Read environment keys from `env` instead of the process environment
    pub fn with_env(mut self, env: Arc<dyn EnvSource>) -> Self {
        self.env = env;
        self
    }

    pub fn max_endpoints(&self) -> usize {
        self.settings.max_endpoints
    }

    /// Discovery target, resolved once.
    ///
    /// The environment key wins over `discovery.infosys`. Failure is not
    /// remembered so a later call can pick up a fixed environment.
    pub fn target(&self) -> Result<DiscoveryTarget> {
        if let Some(existing) = self.target.get() {
            return Ok(existing.clone());
        }

        let _init = self.init.lock();
        if let Some(existing) = self.target.get() {
            return Ok(existing.clone());
        }

        let base_url = self
            .env
            .var(INFOSYS_ENV)
            .or_else(|| self.settings.infosys.clone())
            .filter(|url| !url.is_empty())
            .ok_or(DiscoveryError::NotConfigured)?;

        let resolved = DiscoveryTarget {
            base_url,
            timeout: self.settings.timeout(),
        };
        info!(
            base_url = %resolved.base_url,
            timeout_secs = resolved.timeout.as_secs(),
            "Configured discovery service"
        );
        Ok(self.target.get_or_init(|| resolved).clone())
    }

    /// Query the backend for `host`.
    ///
    /// Does not touch any cache. At most `max_endpoints` descriptors are
    /// returned, in the order the backend reported them.
    #[instrument(skip(self))]
    pub fn discover(&self, host: &str) -> Result<Vec<EndpointDescriptor>> {
        if !self.settings.enabled {
            return Err(DiscoveryError::Disabled);
        }

        let max = self.settings.max_endpoints;
        let mut raw = match &self.backend {
            DiscoveryBackend::External(client) => {
                let target = self.target()?;
                client.query(&target, host, max)?
            }
            DiscoveryBackend::Static(table) => table.query(host, max),
        };
        raw.truncate(max);

        let mut endpoints = Vec::with_capacity(raw.len());
        for endpoint in raw {
            if endpoint.url.is_empty() || endpoint.url.len() > MAX_URL_LEN {
                warn!(host = %host, len = endpoint.url.len(), "Rejecting malformed endpoint url");
                return Err(DiscoveryError::Malformed {
                    host: host.to_string(),
                    reason: format!("endpoint url length {} out of range", endpoint.url.len()),
                });
            }
            endpoints.push(EndpointDescriptor {
                protocol_version: ProtocolVersion::from_type_tag(&endpoint.endpoint_type),
                url: endpoint.url,
            });
        }

        debug!(host = %host, count = endpoints.len(), "Discovered endpoints");
        Ok(endpoints)
    }
}

/// Which endpoints a caller wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolFilter {
    #[default]
    Any,
    Only(ProtocolVersion),
}

impl ProtocolFilter {
    pub fn matches(&self, endpoint: &EndpointDescriptor) -> bool {
        match self {
            Self::Any => true,
            Self::Only(version) => endpoint.protocol_version == *version,
        }
    }

    fn apply(&self, endpoints: Vec<EndpointDescriptor>) -> Vec<EndpointDescriptor> {
        endpoints.into_iter().filter(|e| self.matches(e)).collect()
    }
}

/// Cache-first endpoint lookup
pub struct EndpointService {
    cache: Arc<dyn EndpointCache>,
    resolver: EndpointResolver,
}

impl EndpointService {
    pub fn new(cache: Arc<dyn EndpointCache>, resolver: EndpointResolver) -> Self {
        Self { cache, resolver }
    }

    /// Service with an in-memory cache and a backend from `config`.
    ///
    /// Uses `client` when given, the static table otherwise.
    pub fn from_config(config: &GridConfig, client: Option<Arc<dyn DiscoveryClient>>) -> Self {
        let backend = match client {
            Some(client) => DiscoveryBackend::External(client),
            None => DiscoveryBackend::Static(StaticDiscovery::from_settings(&config.discovery)),
        };
        Self::new(
            Arc::new(MemoryEndpointCache::with_ttl(config.cache.ttl())),
            EndpointResolver::new(backend, config.discovery.clone()),
        )
    }

    pub fn resolver(&self) -> &EndpointResolver {
        &self.resolver
    }

    /// Endpoints for `host` matching `filter`, in discovery order
    #[instrument(skip(self))]
    pub fn resolve_endpoints(
        &self,
        host: &str,
        filter: ProtocolFilter,
    ) -> Result<Vec<EndpointDescriptor>> {
        let max = self.resolver.max_endpoints();
        match self.cache.lookup(host, max) {
            CacheLookup::Hit(endpoints) => Ok(filter.apply(endpoints)),
            CacheLookup::Error(reason) => Err(DiscoveryError::Cache(reason)),
            CacheLookup::Miss => {
                let endpoints = self.resolver.discover(host)?;
                self.cache.record(host, &endpoints);
                Ok(filter.apply(endpoints))
            }
        }
    }

    /// Type tags and urls of every endpoint of `host`, as parallel lists
    pub fn types_and_endpoints(&self, host: &str) -> Result<(Vec<String>, Vec<String>)> {
        let endpoints = self.resolve_endpoints(host, ProtocolFilter::Any)?;
        if endpoints.is_empty() {
            return Err(DiscoveryError::NoEndpoints(host.to_string()));
        }
        Ok(endpoints
            .into_iter()
            .map(|e| (e.protocol_version.type_tag().to_string(), e.url))
            .unzip())
    }
}
