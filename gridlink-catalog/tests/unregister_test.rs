//! Integration tests for replica unregistration

use gridlink_catalog::{
    CatalogConnector, CatalogOp, MemoryCatalog, NewReplica, Registrar, ReplicaStat,
    StorageClient, UnregisterError,
};
use gridlink_core::{CatalogError, CatalogSettings, ChecksumType, ErrorKind, StorageError};
use std::sync::Arc;

const CATALOG_URL: &str = "lfc://cat.example.org/grid/vo/run1/f.root";
const PATH: &str = "/grid/vo/run1/f.root";

/// Storage that is never reached during unregistration
struct NoStorage;

impl StorageClient for NoStorage {
    fn stat(&self, url: &str) -> Result<ReplicaStat, StorageError> {
        Err(StorageError::NotFound(url.to_string()))
    }

    fn checksum(&self, url: &str, _kind: ChecksumType) -> Result<String, StorageError> {
        Err(StorageError::NotFound(url.to_string()))
    }
}

fn registrar(catalog: &MemoryCatalog) -> Registrar {
    Registrar::new(
        Arc::new(catalog.clone()),
        Arc::new(NoStorage),
        CatalogSettings::default(),
    )
}

/// Catalog with one entry carrying two replicas
fn populated() -> MemoryCatalog {
    let catalog = MemoryCatalog::new();
    let entry = catalog.insert_entry(PATH, 100, None);
    let mut session = catalog.connect("cat.example.org").unwrap();
    session
        .add_replica(&NewReplica::new(entry.guid, "se1", "srm://se1/f.root"))
        .unwrap();
    session
        .add_replica(&NewReplica::new(entry.guid, "se2", "srm://se2/f.root"))
        .unwrap();
    session.close();
    catalog
}

#[test]
fn test_unregister_removes_one_mapping() {
    let catalog = populated();
    registrar(&catalog)
        .unregister(CATALOG_URL, "srm://se1/f.root")
        .unwrap();

    let replicas = catalog.replicas(PATH);
    assert_eq!(replicas.len(), 1);
    assert_eq!(replicas[0].url, "srm://se2/f.root");
    assert!(catalog.entry(PATH).is_some());
    assert_eq!(catalog.stats().open_sessions(), 0);
}

#[test]
fn test_unregister_missing_entry() {
    let catalog = MemoryCatalog::new();
    let err = registrar(&catalog)
        .unregister("lfc://cat.example.org/grid/vo/none", "srm://se1/none")
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.code(), Some(2));
    assert!(matches!(
        err,
        UnregisterError::Catalog {
            op: CatalogOp::Stat,
            ..
        }
    ));
    assert_eq!(catalog.stats().delete_replicas, 0);
    assert_eq!(catalog.stats().open_sessions(), 0);
}

#[test]
fn test_unregister_stat_error_stops_delete() {
    let catalog = populated();
    catalog.fail_next(CatalogOp::Stat, CatalogError::backend(110, "timed out"));

    let err = registrar(&catalog)
        .unregister(CATALOG_URL, "srm://se1/f.root")
        .unwrap_err();
    assert_eq!(err.code(), Some(110));
    assert_eq!(catalog.replicas(PATH).len(), 2);
    assert_eq!(catalog.stats().delete_replicas, 0);
}

#[test]
fn test_unregister_unknown_replica() {
    let catalog = populated();
    let err = registrar(&catalog)
        .unregister(CATALOG_URL, "srm://se3/f.root")
        .unwrap_err();
    assert!(matches!(
        err,
        UnregisterError::Catalog {
            op: CatalogOp::DeleteReplica,
            ..
        }
    ));
    assert_eq!(catalog.stats().open_sessions(), 0);
}

#[test]
fn test_unregister_invalid_url() {
    let catalog = MemoryCatalog::new();
    let err = registrar(&catalog)
        .unregister("::", "srm://se1/f.root")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUrl);
    assert_eq!(catalog.stats().connects, 0);
}
