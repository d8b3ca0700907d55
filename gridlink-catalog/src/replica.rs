//! Physical replica inspection
//!
//! Collects size and the best available checksum of a replica before it is
//! registered.

use crate::models::{ReplicaInfo, ReplicaStat};
use gridlink_core::{Checksum, ChecksumType, StorageError};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Metadata and checksum queries against storage
pub trait StorageClient: Send + Sync {
    fn stat(&self, url: &str) -> Result<ReplicaStat, StorageError>;

    /// Checksum of `url` as a hex string
    fn checksum(&self, url: &str, kind: ChecksumType) -> Result<String, StorageError>;
}

/// Gathers [`ReplicaInfo`] for a replica url
#[derive(Clone)]
pub struct ReplicaInfoCollector {
    storage: Arc<dyn StorageClient>,
}

impl ReplicaInfoCollector {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self { storage }
    }

    /// Stat `url`, then try each checksum type in priority order.
    ///
    /// A stat failure is returned as is. The first checksum that succeeds
    /// wins; when none does the info carries no checksum.
    #[instrument(skip(self))]
    pub fn collect(&self, url: &str) -> Result<ReplicaInfo, StorageError> {
        let stat = self.storage.stat(url).map_err(|e| {
            warn!(url = %url, error = %e, "Failed to stat replica");
            e
        })?;

        let checksum = ChecksumType::PRIORITY
            .iter()
            .find_map(|kind| self.try_checksum(url, *kind));

        debug!(url = %url, size = stat.size, checksum = ?checksum, "Collected replica info");
        Ok(ReplicaInfo {
            size: stat.size,
            checksum,
        })
    }

    fn try_checksum(&self, url: &str, kind: ChecksumType) -> Option<Checksum> {
        match self.storage.checksum(url, kind) {
            Ok(value) => {
                let checksum = Checksum::new(kind, value);
                if checksum.fits_catalog() {
                    Some(checksum)
                } else {
                    debug!(url = %url, algorithm = kind.algorithm(), "Unusable checksum value");
                    None
                }
            }
            Err(e) => {
                debug!(
                    url = %url,
                    algorithm = kind.algorithm(),
                    error = %e,
                    "Checksum unavailable"
                );
                None
            }
        }
    }
}
