//! DNS alias resolution
//!
//! Pins a DNS alias to one concrete host. Every call performs a fresh
//! forward lookup and picks one of the returned addresses at random, so
//! repeated resolutions during a long run spread load across all nodes
//! behind the alias.

use hickory_resolver::Resolver;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;
use std::net::{IpAddr, ToSocketAddrs};
use thiserror::Error;
use tracing::{debug, warn};

/// Resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Could not resolve DNS alias {alias}: {reason}")]
    NotFound { alias: String, reason: String },

    #[error("Name service unavailable: {0}")]
    Unavailable(String),
}

impl ResolveError {
    fn not_found(alias: &str, reason: impl Into<String>) -> Self {
        Self::NotFound {
            alias: alias.to_string(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> gridlink_core::ErrorKind {
        match self {
            Self::NotFound { .. } => gridlink_core::ErrorKind::NotFound,
            Self::Unavailable(_) => gridlink_core::ErrorKind::Discovery,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;

/// Forward and reverse name lookups
pub trait NameService: Send + Sync {
    /// All addresses of `host`, any address family
    fn forward(&self, host: &str) -> io::Result<Vec<IpAddr>>;

    /// Canonical name of `addr`; fails when no name is registered
    fn reverse(&self, addr: IpAddr) -> io::Result<String>;
}

impl<T: NameService + ?Sized> NameService for std::sync::Arc<T> {
    fn forward(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        (**self).forward(host)
    }

    fn reverse(&self, addr: IpAddr) -> io::Result<String> {
        (**self).reverse(addr)
    }
}

/// Name service backed by the platform resolver for forward lookups and
/// the system-configured DNS servers for reverse lookups
pub struct SystemNameService {
    resolver: Resolver,
}

impl SystemNameService {
    pub fn new() -> io::Result<Self> {
        let resolver = Resolver::from_system_conf()?;
        Ok(Self { resolver })
    }
}

impl NameService for SystemNameService {
    fn forward(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let mut addrs: Vec<IpAddr> = Vec::new();
        for sock in (host, 0u16).to_socket_addrs()? {
            // getaddrinfo repeats addresses once per socket type
            if !addrs.contains(&sock.ip()) {
                addrs.push(sock.ip());
            }
        }
        Ok(addrs)
    }

    fn reverse(&self, addr: IpAddr) -> io::Result<String> {
        let lookup = self
            .resolver
            .reverse_lookup(addr)
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e.to_string()))?;

        lookup
            .iter()
            .next()
            .map(|name| name.to_utf8().trim_end_matches('.').to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no PTR record for {}", addr))
            })
    }
}

/// Resolves a DNS alias to one load-distributed hostname
pub struct HostnameResolver<N: NameService> {
    names: N,
    rng: Mutex<StdRng>,
}

impl HostnameResolver<SystemNameService> {
    /// Resolver using the system name service
    pub fn system() -> Result<Self> {
        let names =
            SystemNameService::new().map_err(|e| ResolveError::Unavailable(e.to_string()))?;
        Ok(Self::new(names))
    }
}

impl<N: NameService> HostnameResolver<N> {
    /// Create a resolver seeded from OS entropy
    pub fn new(names: N) -> Self {
        Self {
            names,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a resolver with a deterministic random source
    pub fn with_seed(names: N, seed: u64) -> Self {
        Self {
            names,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Get the underlying name service
    pub fn name_service(&self) -> &N {
        &self.names
    }

    /// Resolve `alias` to the canonical name of one of its addresses.
    ///
    /// Fails with [`ResolveError::NotFound`] when the alias has no address
    /// or the selected address has no canonical name.
    pub fn resolve(&self, alias: &str) -> Result<String> {
        let addrs = match self.names.forward(alias) {
            Ok(addrs) if !addrs.is_empty() => addrs,
            Ok(_) => {
                warn!(alias = %alias, "Could not resolve DNS alias: no addresses");
                return Err(ResolveError::not_found(alias, "no addresses"));
            }
            Err(e) => {
                warn!(alias = %alias, error = %e, "Could not resolve DNS alias");
                return Err(ResolveError::not_found(alias, e.to_string()));
            }
        };

        let mut resolved = Vec::with_capacity(addrs.len());
        for addr in &addrs {
            match self.names.reverse(*addr) {
                Ok(name) => resolved.push(format!("{}[{}]", name, addr)),
                Err(e) => {
                    warn!(address = %addr, error = %e, "Failed reverse address into hostname")
                }
            }
        }
        debug!(alias = %alias, resolved = %resolved.join(" "), "Resolved DNS alias");

        let selected = addrs[self.rng.lock().gen_range(0..addrs.len())];

        match self.names.reverse(selected) {
            Ok(name) => {
                debug!(alias = %alias, address = %selected, hostname = %name, "Selected host");
                Ok(name)
            }
            Err(e) => {
                warn!(
                    alias = %alias,
                    address = %selected,
                    error = %e,
                    "Failed reverse DNS resolution"
                );
                Err(ResolveError::not_found(
                    alias,
                    format!("no canonical name for {}", selected),
                ))
            }
        }
    }
}
