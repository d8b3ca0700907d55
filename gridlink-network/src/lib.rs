//! GridLink Network Layer
//!
//! Name resolution and endpoint discovery for storage hosts:
//! - **Hostname resolution**: pins a DNS alias to one of its nodes at random
//! - **URL rewriting**: substitutes the resolved node into a storage URL
//! - **Endpoint discovery**: cache-first lookup of a host's protocol endpoints
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   EndpointService                     │
//! │                                                       │
//! │  ┌──────────────────┐  miss  ┌─────────────────────┐ │
//! │  │  EndpointCache   │ ─────► │  EndpointResolver   │ │
//! │  │  (host → urls)   │ ◄───── │  (external/static)  │ │
//! │  └──────────────────┘ record └─────────────────────┘ │
//! └──────────────────────────────────────────│────────────┘
//!                                            ▼
//!                                   ┌─────────────────┐
//!                                   │ DiscoveryClient │
//!                                   └─────────────────┘
//!
//! ┌──────────────┐   resolve   ┌──────────────────┐
//! │ UriRewriter  │ ──────────► │ HostnameResolver │ ──► NameService
//! └──────────────┘             └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use gridlink_core::GridConfig;
//! use gridlink_network::{EndpointService, ProtocolFilter, ProtocolVersion};
//!
//! let config = GridConfig::load_or_default("gridlink.toml").with_env_overrides();
//! let service = EndpointService::from_config(&config, None);
//!
//! let endpoints = service.resolve_endpoints(
//!     "se.example.org",
//!     ProtocolFilter::Only(ProtocolVersion::V2),
//! )?;
//! ```

pub mod cache;
pub mod discovery;
pub mod resolver;
pub mod rewrite;

pub use cache::{CacheLookup, EndpointCache, EndpointCacheStats, MemoryEndpointCache};
pub use discovery::{
    DiscoveredEndpoint, DiscoveryBackend, DiscoveryClient, DiscoveryError, DiscoveryTarget,
    EndpointDescriptor, EndpointResolver, EndpointService, ProtocolFilter, ProtocolVersion,
    StaticDiscovery,
};
pub use resolver::{HostnameResolver, NameService, ResolveError, SystemNameService};
pub use rewrite::{RewriteError, UriRewriter};
