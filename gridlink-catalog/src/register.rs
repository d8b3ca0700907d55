//! Replica registration and unregistration
//!
//! `register` records a physical replica in the catalog, creating the
//! logical entry when needed. An existing entry is validated against the
//! replica before anything is written, so a catalog entry is never updated
//! to disagree with its replicas. Registering the same replica twice
//! succeeds both times.
//!
//! `unregister` removes one replica mapping from an existing entry.

use crate::client::{CatalogConnector, CatalogOp, CatalogSession, SessionGuard};
use crate::models::{CatalogEntry, CatalogFileId, NewReplica, ReplicaInfo};
use crate::replica::{ReplicaInfoCollector, StorageClient};
use gridlink_core::location::{self, CatalogLocation};
use gridlink_core::{CatalogError, CatalogSettings, ErrorKind, StorageError, UrlError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Registration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("Invalid url: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Failed to inspect replica: {0}")]
    Stat(#[from] StorageError),

    #[error("Replica is inconsistent with catalog entry {path}: {reason}")]
    Inconsistent { path: String, reason: String },

    #[error("Catalog {op} failed for {path}: {source}")]
    Catalog {
        op: CatalogOp,
        path: String,
        #[source]
        source: CatalogError,
    },
}

impl RegisterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl(_) => ErrorKind::InvalidUrl,
            Self::Stat(e) => e.kind(),
            Self::Inconsistent { .. } => ErrorKind::Inconsistent,
            Self::Catalog { source, .. } => source.kind(),
        }
    }

    /// Underlying catalog error code, if the catalog failed
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Catalog { source, .. } => Some(source.code()),
            _ => None,
        }
    }
}

/// Unregistration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnregisterError {
    #[error("Invalid url: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Catalog {op} failed for {path}: {source}")]
    Catalog {
        op: CatalogOp,
        path: String,
        #[source]
        source: CatalogError,
    },
}

impl UnregisterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl(_) => ErrorKind::InvalidUrl,
            Self::Catalog { source, .. } => source.kind(),
        }
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Catalog { source, .. } => Some(source.code()),
            _ => None,
        }
    }
}

fn register_failed(op: CatalogOp, path: &str, source: CatalogError) -> RegisterError {
    warn!(op = %op, path = %path, error = %source, "Catalog operation failed");
    RegisterError::Catalog {
        op,
        path: path.to_string(),
        source,
    }
}

fn unregister_failed(op: CatalogOp, path: &str, source: CatalogError) -> UnregisterError {
    warn!(op = %op, path = %path, error = %source, "Catalog operation failed");
    UnregisterError::Catalog {
        op,
        path: path.to_string(),
        source,
    }
}

/// Registers and unregisters replicas in a file catalog
pub struct Registrar {
    connector: Arc<dyn CatalogConnector>,
    collector: ReplicaInfoCollector,
    settings: CatalogSettings,
}

impl Registrar {
    pub fn new(
        connector: Arc<dyn CatalogConnector>,
        storage: Arc<dyn StorageClient>,
        settings: CatalogSettings,
    ) -> Self {
        Self {
            connector,
            collector: ReplicaInfoCollector::new(storage),
            settings,
        }
    }

    /// Whether `catalog_url` names a catalog this registrar handles
    pub fn accepts(&self, catalog_url: &str) -> bool {
        match location::parse(catalog_url) {
            Ok(url) => self.settings.schemes.iter().any(|s| s == url.scheme()),
            Err(_) => false,
        }
    }

    /// Register the replica at `source_url` under `catalog_url`.
    ///
    /// The catalog session is closed on every path out of this call.
    #[instrument(skip(self))]
    pub fn register(&self, source_url: &str, catalog_url: &str) -> Result<(), RegisterError> {
        let target = CatalogLocation::parse(catalog_url)?;
        let source_host = location::storage_host(source_url)?;

        let info = self.collector.collect(source_url)?;

        let mut session = SessionGuard::open(self.connector.as_ref(), &target.host)
            .map_err(|e| register_failed(CatalogOp::Connect, &target.path, e))?;

        let replica = match session.stat(&target.path) {
            Ok(entry) => {
                validate(&entry, &info)?;
                debug!(path = %target.path, file_id = entry.file_id, "Catalog entry validated");
                NewReplica::new(entry.guid, &source_host, source_url).with_file_id(
                    CatalogFileId {
                        server: target.host.clone(),
                        file_id: entry.file_id,
                    },
                )
            }
            Err(e) if e.is_not_found() => {
                let guid = self.create_entry(&mut *session, &target, &info)?;
                NewReplica::new(guid, &source_host, source_url)
            }
            Err(e) => return Err(register_failed(CatalogOp::Stat, &target.path, e)),
        };

        match session.add_replica(&replica) {
            Ok(()) => {
                info!(path = %target.path, host = %source_host, "Registered replica");
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                info!(path = %target.path, url = %source_url, "Replica already registered");
                Ok(())
            }
            Err(e) => Err(register_failed(CatalogOp::AddReplica, &target.path, e)),
        }
    }

    fn create_entry(
        &self,
        session: &mut dyn CatalogSession,
        target: &CatalogLocation,
        info: &ReplicaInfo,
    ) -> Result<Uuid, RegisterError> {
        let guid = Uuid::new_v4();

        if let Some(parent) = target.parent() {
            session
                .mkdir_recursive(parent, self.settings.dir_mode)
                .map_err(|e| register_failed(CatalogOp::Mkdir, parent, e))?;
        }

        session
            .create(&target.path, guid, self.settings.file_mode)
            .map_err(|e| register_failed(CatalogOp::Create, &target.path, e))?;

        session
            .set_metadata(guid, info)
            .map_err(|e| register_failed(CatalogOp::SetMetadata, &target.path, e))?;

        debug!(path = %target.path, guid = %guid, size = info.size, "Created catalog entry");
        Ok(guid)
    }

    /// Remove the mapping of `replica_url` from the entry at `catalog_url`
    #[instrument(skip(self))]
    pub fn unregister(&self, catalog_url: &str, replica_url: &str) -> Result<(), UnregisterError> {
        let target = CatalogLocation::parse(catalog_url)?;

        let mut session = SessionGuard::open(self.connector.as_ref(), &target.host)
            .map_err(|e| unregister_failed(CatalogOp::Connect, &target.path, e))?;

        let entry = session
            .stat(&target.path)
            .map_err(|e| unregister_failed(CatalogOp::Stat, &target.path, e))?;

        session
            .delete_replica(entry.file_id, replica_url)
            .map_err(|e| unregister_failed(CatalogOp::DeleteReplica, &target.path, e))?;

        info!(path = %target.path, url = %replica_url, "Unregistered replica");
        Ok(())
    }
}

/// Compare an existing entry with the replica about to be added.
///
/// Checksums are compared only when both sides carry one of the same type.
fn validate(entry: &CatalogEntry, info: &ReplicaInfo) -> Result<(), RegisterError> {
    if entry.size != info.size {
        return Err(RegisterError::Inconsistent {
            path: entry.path.clone(),
            reason: format!(
                "size mismatch: catalog {} != replica {}",
                entry.size, info.size
            ),
        });
    }

    match (&entry.checksum, &info.checksum) {
        (Some(catalog), Some(replica)) if catalog.kind == replica.kind => {
            if catalog.value != replica.value {
                return Err(RegisterError::Inconsistent {
                    path: entry.path.clone(),
                    reason: format!(
                        "checksum mismatch: catalog {} != replica {}",
                        catalog, replica
                    ),
                });
            }
        }
        (catalog, replica) => {
            warn!(
                path = %entry.path,
                catalog = ?catalog,
                replica = ?replica,
                "Checksum validation skipped"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlink_core::Checksum;
    use proptest::prelude::*;

    fn entry(size: u64, checksum: Option<Checksum>) -> CatalogEntry {
        CatalogEntry {
            file_id: 1,
            guid: Uuid::nil(),
            size,
            checksum,
            path: "/grid/x".to_string(),
        }
    }

    fn info(size: u64, checksum: Option<Checksum>) -> ReplicaInfo {
        ReplicaInfo { size, checksum }
    }

    #[test]
    fn test_validate_matching() {
        let sum = Some(Checksum::adler32("abc123"));
        assert!(validate(&entry(10, sum.clone()), &info(10, sum)).is_ok());
    }

    #[test]
    fn test_validate_size_mismatch() {
        let err = validate(&entry(10, None), &info(11, None)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Inconsistent);
    }

    #[test]
    fn test_validate_checksum_mismatch() {
        let err = validate(
            &entry(10, Some(Checksum::adler32("abc123"))),
            &info(10, Some(Checksum::adler32("abc124"))),
        )
        .unwrap_err();
        assert!(matches!(err, RegisterError::Inconsistent { .. }));
    }

    #[test]
    fn test_validate_checksum_case_sensitive() {
        assert!(validate(
            &entry(10, Some(Checksum::adler32("ABC123"))),
            &info(10, Some(Checksum::adler32("abc123"))),
        )
        .is_err());
    }

    #[test]
    fn test_validate_skips_different_types() {
        assert!(validate(
            &entry(10, Some(Checksum::md5("d41d8cd98f00b204e9800998ecf8427e"))),
            &info(10, Some(Checksum::adler32("abc123"))),
        )
        .is_ok());
        assert!(validate(&entry(10, None), &info(10, Some(Checksum::adler32("abc123")))).is_ok());
        assert!(validate(&entry(10, Some(Checksum::adler32("abc123"))), &info(10, None)).is_ok());
    }

    #[test]
    fn test_error_kinds_and_codes() {
        let err = RegisterError::Catalog {
            op: CatalogOp::Create,
            path: "/x".to_string(),
            source: CatalogError::AlreadyExists("/x".to_string()),
        };
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(err.code(), Some(17));
        assert_eq!(
            err.to_string(),
            "Catalog create failed for /x: Catalog entry already exists: /x"
        );

        let err = UnregisterError::Catalog {
            op: CatalogOp::Stat,
            path: "/x".to_string(),
            source: CatalogError::NotFound("/x".to_string()),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.code(), Some(2));

        let err = RegisterError::from(StorageError::backend(5, "io"));
        assert_eq!(err.kind(), ErrorKind::Stat);
        assert_eq!(err.code(), None);
    }

    proptest! {
        #[test]
        fn prop_size_mismatch_always_rejected(a in any::<u64>(), b in any::<u64>()) {
            prop_assume!(a != b);
            let result = validate(&entry(a, None), &info(b, None));
            let rejected = matches!(result, Err(RegisterError::Inconsistent { .. }));
            prop_assert!(rejected);
        }

        #[test]
        fn prop_checksum_compared_only_for_same_type(
            size in any::<u64>(),
            left in "[0-9a-f]{8}",
            right in "[0-9a-f]{8}",
        ) {
            let same = validate(
                &entry(size, Some(Checksum::adler32(left.clone()))),
                &info(size, Some(Checksum::adler32(right.clone()))),
            );
            prop_assert_eq!(same.is_ok(), left == right);

            let mixed = validate(
                &entry(size, Some(Checksum::md5(left))),
                &info(size, Some(Checksum::adler32(right))),
            );
            prop_assert!(mixed.is_ok());
        }
    }
}
