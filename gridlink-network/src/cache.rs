//! Endpoint cache
//!
//! Holds discovered endpoints per storage host so that repeated lookups for
//! the same host do not reach the discovery service.

use crate::discovery::EndpointDescriptor;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Cached endpoints, in discovery order
    Hit(Vec<EndpointDescriptor>),
    /// Nothing cached for the host
    Miss,
    /// The cache itself failed
    Error(String),
}

/// Per-host endpoint store.
///
/// The cache decides what gets stored; callers hand every discovery result
/// to [`record`](EndpointCache::record).
pub trait EndpointCache: Send + Sync {
    /// Look up at most `max` endpoints for `host`
    fn lookup(&self, host: &str, max: usize) -> CacheLookup;

    /// Offer a discovery result for `host`
    fn record(&self, host: &str, endpoints: &[EndpointDescriptor]);
}

struct CachedEndpoints {
    endpoints: Vec<EndpointDescriptor>,
    stored_at: Instant,
}

/// In-process endpoint cache
pub struct MemoryEndpointCache {
    entries: RwLock<HashMap<String, CachedEndpoints>>,

    /// Entry lifetime (None = never expire)
    ttl: Option<Duration>,

    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryEndpointCache {
    /// Create a cache whose entries never expire
    pub fn new() -> Self {
        Self::with_ttl(None)
    }

    /// Create a cache with an optional entry lifetime
    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Number of hosts currently cached
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop the entry for `host`
    pub fn invalidate(&self, host: &str) {
        self.entries.write().remove(host);
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn stats(&self) -> EndpointCacheStats {
        EndpointCacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn is_expired(&self, entry: &CachedEndpoints) -> bool {
        match self.ttl {
            Some(ttl) => entry.stored_at.elapsed() >= ttl,
            None => false,
        }
    }
}

impl Default for MemoryEndpointCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointCache for MemoryEndpointCache {
    fn lookup(&self, host: &str, max: usize) -> CacheLookup {
        let entries = self.entries.read();
        match entries.get(host) {
            Some(entry) if !self.is_expired(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(host = %host, count = entry.endpoints.len(), "Endpoint cache hit");
                CacheLookup::Hit(entry.endpoints.iter().take(max).cloned().collect())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(host = %host, "Endpoint cache miss");
                CacheLookup::Miss
            }
        }
    }

    fn record(&self, host: &str, endpoints: &[EndpointDescriptor]) {
        if endpoints.is_empty() {
            return;
        }
        self.entries.write().insert(
            host.to_string(),
            CachedEndpoints {
                endpoints: endpoints.to_vec(),
                stored_at: Instant::now(),
            },
        );
    }
}

/// Endpoint cache statistics
#[derive(Debug, Clone, Default)]
pub struct EndpointCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl EndpointCacheStats {
    /// Calculate hit ratio
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
