//! GridLink Replica Catalog
//!
//! Keeps a remote file catalog consistent with the physical replicas it
//! points to:
//! - Replica inspection (size, best available checksum)
//! - Registration: validate or create the logical entry, then add the replica
//! - Unregistration: remove one replica mapping
//!
//! The catalog itself is reached through [`CatalogConnector`]; an in-memory
//! implementation is provided in [`memory`].

pub mod client;
pub mod memory;
pub mod models;
pub mod register;
pub mod replica;

pub use client::{CatalogConnector, CatalogOp, CatalogSession, SessionGuard};
pub use memory::{MemoryCatalog, MemoryCatalogStats};
pub use models::{
    CatalogEntry, CatalogFileId, NewReplica, ReplicaFileType, ReplicaInfo, ReplicaMapping,
    ReplicaStat, ReplicaStatus,
};
pub use register::{RegisterError, Registrar, UnregisterError};
pub use replica::{ReplicaInfoCollector, StorageClient};
