//! Replica catalog models
//!
//! Snapshots and requests exchanged with a catalog backend.

use gridlink_core::Checksum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Physical replica facts gathered before registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaInfo {
    pub size: u64,
    pub checksum: Option<Checksum>,
}

/// Storage metadata of a physical replica
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaStat {
    pub size: u64,
}

/// Catalog entry as returned by stat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub file_id: u64,
    pub guid: Uuid,
    pub size: u64,
    pub checksum: Option<Checksum>,
    pub path: String,
}

/// Catalog-unique file identifier, qualified by the catalog host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogFileId {
    pub server: String,
    pub file_id: u64,
}

/// Replica availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReplicaStatus {
    #[default]
    Available,
}

impl ReplicaStatus {
    /// Single-character catalog code
    pub fn code(&self) -> char {
        match self {
            Self::Available => '-',
        }
    }
}

/// Replica retention class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReplicaFileType {
    #[default]
    Permanent,
}

impl ReplicaFileType {
    /// Single-character catalog code
    pub fn code(&self) -> char {
        match self {
            Self::Permanent => 'P',
        }
    }
}

/// Add-replica request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReplica {
    pub guid: Uuid,
    /// Only known when the entry existed before this registration
    pub file_id: Option<CatalogFileId>,
    pub host: String,
    pub url: String,
    pub status: ReplicaStatus,
    pub file_type: ReplicaFileType,
}

impl NewReplica {
    /// Available, permanent replica of `guid` at `url`
    pub fn new(guid: Uuid, host: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            guid,
            file_id: None,
            host: host.into(),
            url: url.into(),
            status: ReplicaStatus::Available,
            file_type: ReplicaFileType::Permanent,
        }
    }

    pub fn with_file_id(mut self, file_id: CatalogFileId) -> Self {
        self.file_id = Some(file_id);
        self
    }
}

/// Registered replica; unique by (file_id, host, url)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaMapping {
    pub file_id: u64,
    pub host: String,
    pub url: String,
    pub status: ReplicaStatus,
    pub file_type: ReplicaFileType,
}
