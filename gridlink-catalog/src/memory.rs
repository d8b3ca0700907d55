//! In-memory catalog backend
//!
//! Used for testing and embedding. Not persistent.

use crate::client::{CatalogConnector, CatalogOp, CatalogSession, Result};
use crate::models::{CatalogEntry, NewReplica, ReplicaInfo, ReplicaMapping};
use gridlink_core::location::parent_dir;
use gridlink_core::{CatalogError, Checksum};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const EISDIR: i32 = 21;
const EINVAL: i32 = 22;

struct FileRecord {
    file_id: u64,
    guid: Uuid,
    size: u64,
    checksum: Option<Checksum>,
    mode: u32,
}

#[derive(Default)]
struct Namespace {
    dirs: HashSet<String>,
    files: HashMap<String, FileRecord>,
    guids: HashMap<Uuid, String>,
    replicas: Vec<ReplicaMapping>,
    next_file_id: u64,
}

impl Namespace {
    fn dir_exists(&self, path: &str) -> bool {
        path == "/" || path.is_empty() || self.dirs.contains(path)
    }

    fn parent_exists(&self, path: &str) -> bool {
        match parent_dir(path) {
            Some(parent) => self.dir_exists(parent),
            None => true,
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.dirs.contains(path) || self.files.contains_key(path)
    }

    fn entry(&self, path: &str) -> Option<CatalogEntry> {
        self.files.get(path).map(|f| CatalogEntry {
            file_id: f.file_id,
            guid: f.guid,
            size: f.size,
            checksum: f.checksum.clone(),
            path: path.to_string(),
        })
    }

    fn insert_file(&mut self, path: &str, guid: Uuid, mode: u32) -> u64 {
        self.next_file_id += 1;
        let file_id = self.next_file_id;
        self.files.insert(
            path.to_string(),
            FileRecord {
                file_id,
                guid,
                size: 0,
                checksum: None,
                mode,
            },
        );
        self.guids.insert(guid, path.to_string());
        file_id
    }
}

#[derive(Default)]
struct Counters {
    connects: AtomicU64,
    closes: AtomicU64,
    stats: AtomicU64,
    accesses: AtomicU64,
    mkdirs: AtomicU64,
    creates: AtomicU64,
    set_metadata: AtomicU64,
    add_replicas: AtomicU64,
    delete_replicas: AtomicU64,
}

impl Counters {
    fn bump(&self, op: CatalogOp) {
        let counter = match op {
            CatalogOp::Connect => &self.connects,
            CatalogOp::Stat => &self.stats,
            CatalogOp::Access => &self.accesses,
            CatalogOp::Mkdir => &self.mkdirs,
            CatalogOp::Create => &self.creates,
            CatalogOp::SetMetadata => &self.set_metadata,
            CatalogOp::AddReplica => &self.add_replicas,
            CatalogOp::DeleteReplica => &self.delete_replicas,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Shared {
    namespace: RwLock<Namespace>,
    faults: Mutex<HashMap<CatalogOp, VecDeque<CatalogError>>>,
    counters: Counters,
}

impl Shared {
    /// Count the call and return an injected failure, if any
    fn begin(&self, op: CatalogOp) -> Result<()> {
        self.counters.bump(op);
        let mut faults = self.faults.lock();
        match faults.get_mut(&op).and_then(|queue| queue.pop_front()) {
            Some(err) => {
                debug!(op = %op, error = %err, "Injected catalog failure");
                Err(err)
            }
            None => Ok(()),
        }
    }
}

/// In-memory replica catalog
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    shared: Arc<Shared>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call of `op` with `error`.
    ///
    /// Calls queue up; each injected error is used once.
    pub fn fail_next(&self, op: CatalogOp, error: CatalogError) {
        self.shared
            .faults
            .lock()
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Create a file entry directly, with any missing parents
    pub fn insert_entry(&self, path: &str, size: u64, checksum: Option<Checksum>) -> CatalogEntry {
        let mut ns = self.shared.namespace.write();
        let mut parent = parent_dir(path);
        while let Some(dir) = parent {
            ns.dirs.insert(dir.to_string());
            parent = parent_dir(dir);
        }

        let guid = Uuid::new_v4();
        let file_id = ns.insert_file(path, guid, 0o644);
        if let Some(record) = ns.files.get_mut(path) {
            record.size = size;
            record.checksum = checksum.clone();
        }
        CatalogEntry {
            file_id,
            guid,
            size,
            checksum,
            path: path.to_string(),
        }
    }

    pub fn entry(&self, path: &str) -> Option<CatalogEntry> {
        self.shared.namespace.read().entry(path)
    }

    /// Mode the entry at `path` was created with
    pub fn mode(&self, path: &str) -> Option<u32> {
        self.shared.namespace.read().files.get(path).map(|f| f.mode)
    }

    pub fn dir_exists(&self, path: &str) -> bool {
        self.shared.namespace.read().dir_exists(path)
    }

    /// Replica mappings of the entry at `path`
    pub fn replicas(&self, path: &str) -> Vec<ReplicaMapping> {
        let ns = self.shared.namespace.read();
        match ns.files.get(path) {
            Some(file) => ns
                .replicas
                .iter()
                .filter(|r| r.file_id == file.file_id)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn stats(&self) -> MemoryCatalogStats {
        let c = &self.shared.counters;
        let ns = self.shared.namespace.read();
        MemoryCatalogStats {
            directories: ns.dirs.len(),
            files: ns.files.len(),
            replicas: ns.replicas.len(),
            connects: c.connects.load(Ordering::SeqCst),
            closes: c.closes.load(Ordering::SeqCst),
            stats: c.stats.load(Ordering::SeqCst),
            accesses: c.accesses.load(Ordering::SeqCst),
            mkdirs: c.mkdirs.load(Ordering::SeqCst),
            creates: c.creates.load(Ordering::SeqCst),
            set_metadata: c.set_metadata.load(Ordering::SeqCst),
            add_replicas: c.add_replicas.load(Ordering::SeqCst),
            delete_replicas: c.delete_replicas.load(Ordering::SeqCst),
        }
    }
}

impl CatalogConnector for MemoryCatalog {
    fn connect(&self, host: &str) -> Result<Box<dyn CatalogSession>> {
        self.shared.begin(CatalogOp::Connect)?;
        Ok(Box::new(MemorySession {
            host: host.to_string(),
            shared: self.shared.clone(),
        }))
    }
}

struct MemorySession {
    host: String,
    shared: Arc<Shared>,
}

impl CatalogSession for MemorySession {
    fn host(&self) -> &str {
        &self.host
    }

    fn stat(&mut self, path: &str) -> Result<CatalogEntry> {
        self.shared.begin(CatalogOp::Stat)?;
        let ns = self.shared.namespace.read();
        if ns.dirs.contains(path) {
            return Err(CatalogError::backend(EISDIR, format!("{} is a directory", path)));
        }
        ns.entry(path)
            .ok_or_else(|| CatalogError::NotFound(path.to_string()))
    }

    fn exists(&mut self, path: &str) -> Result<bool> {
        self.shared.begin(CatalogOp::Access)?;
        let ns = self.shared.namespace.read();
        Ok(ns.dir_exists(path) || ns.exists(path))
    }

    fn mkdir(&mut self, path: &str, _mode: u32) -> Result<()> {
        self.shared.begin(CatalogOp::Mkdir)?;
        let mut ns = self.shared.namespace.write();
        if ns.exists(path) {
            return Err(CatalogError::AlreadyExists(path.to_string()));
        }
        if !ns.parent_exists(path) {
            return Err(CatalogError::NotFound(path.to_string()));
        }
        ns.dirs.insert(path.to_string());
        Ok(())
    }

    fn create(&mut self, path: &str, guid: Uuid, mode: u32) -> Result<()> {
        self.shared.begin(CatalogOp::Create)?;
        let mut ns = self.shared.namespace.write();
        if ns.exists(path) || ns.guids.contains_key(&guid) {
            return Err(CatalogError::AlreadyExists(path.to_string()));
        }
        if !ns.parent_exists(path) {
            return Err(CatalogError::NotFound(path.to_string()));
        }
        ns.insert_file(path, guid, mode);
        Ok(())
    }

    fn set_metadata(&mut self, guid: Uuid, info: &ReplicaInfo) -> Result<()> {
        self.shared.begin(CatalogOp::SetMetadata)?;
        let mut ns = self.shared.namespace.write();
        let path = ns
            .guids
            .get(&guid)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(guid.to_string()))?;
        let record = ns
            .files
            .get_mut(&path)
            .ok_or_else(|| CatalogError::NotFound(path.clone()))?;
        record.size = info.size;
        record.checksum = info.checksum.clone().filter(|c| c.fits_catalog());
        Ok(())
    }

    fn add_replica(&mut self, replica: &NewReplica) -> Result<()> {
        self.shared.begin(CatalogOp::AddReplica)?;
        let mut ns = self.shared.namespace.write();
        let file_id = ns
            .guids
            .get(&replica.guid)
            .and_then(|path| ns.files.get(path))
            .map(|f| f.file_id)
            .ok_or_else(|| CatalogError::NotFound(replica.guid.to_string()))?;

        if let Some(id) = &replica.file_id {
            if id.file_id != file_id {
                return Err(CatalogError::backend(
                    EINVAL,
                    format!("file id {} does not match guid {}", id.file_id, replica.guid),
                ));
            }
        }

        let duplicate = ns
            .replicas
            .iter()
            .any(|r| r.file_id == file_id && r.host == replica.host && r.url == replica.url);
        if duplicate {
            return Err(CatalogError::AlreadyExists(replica.url.clone()));
        }

        debug!(
            file_id,
            url = %replica.url,
            status = %replica.status.code(),
            file_type = %replica.file_type.code(),
            "Added replica"
        );
        ns.replicas.push(ReplicaMapping {
            file_id,
            host: replica.host.clone(),
            url: replica.url.clone(),
            status: replica.status,
            file_type: replica.file_type,
        });
        Ok(())
    }

    fn delete_replica(&mut self, file_id: u64, url: &str) -> Result<()> {
        self.shared.begin(CatalogOp::DeleteReplica)?;
        let mut ns = self.shared.namespace.write();
        let before = ns.replicas.len();
        ns.replicas.retain(|r| !(r.file_id == file_id && r.url == url));
        if ns.replicas.len() == before {
            return Err(CatalogError::NotFound(url.to_string()));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.shared.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Memory catalog statistics
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogStats {
    pub directories: usize,
    pub files: usize,
    pub replicas: usize,
    pub connects: u64,
    pub closes: u64,
    pub stats: u64,
    pub accesses: u64,
    pub mkdirs: u64,
    pub creates: u64,
    pub set_metadata: u64,
    pub add_replicas: u64,
    pub delete_replicas: u64,
}

impl MemoryCatalogStats {
    /// Sessions opened but not closed
    pub fn open_sessions(&self) -> u64 {
        self.connects.saturating_sub(self.closes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReplicaFileType, ReplicaStatus};

    fn session(catalog: &MemoryCatalog) -> Box<dyn CatalogSession> {
        catalog.connect("cat").unwrap()
    }

    #[test]
    fn test_mkdir_requires_parent() {
        let catalog = MemoryCatalog::new();
        let mut s = session(&catalog);
        assert!(s.mkdir("/a/b", 0o755).unwrap_err().is_not_found());
        s.mkdir("/a", 0o755).unwrap();
        s.mkdir("/a/b", 0o755).unwrap();
        assert!(s.mkdir("/a/b", 0o755).unwrap_err().is_already_exists());
        assert!(catalog.dir_exists("/a/b"));
    }

    #[test]
    fn test_create_and_stat() {
        let catalog = MemoryCatalog::new();
        let mut s = session(&catalog);
        let guid = Uuid::new_v4();
        s.create("/x", guid, 0o644).unwrap();
        s.set_metadata(
            guid,
            &ReplicaInfo {
                size: 42,
                checksum: Some(Checksum::adler32("abc")),
            },
        )
        .unwrap();

        let entry = s.stat("/x").unwrap();
        assert_eq!(entry.guid, guid);
        assert_eq!(entry.size, 42);
        assert_eq!(entry.checksum, Some(Checksum::adler32("abc")));
        assert_eq!(catalog.mode("/x"), Some(0o644));

        assert!(s.create("/x", Uuid::new_v4(), 0o644).unwrap_err().is_already_exists());
    }

    #[test]
    fn test_replica_bookkeeping() {
        let catalog = MemoryCatalog::new();
        let entry = catalog.insert_entry("/d/x", 1, None);
        let mut s = session(&catalog);

        let replica = NewReplica::new(entry.guid, "se1", "srm://se1/x");
        s.add_replica(&replica).unwrap();
        assert!(s.add_replica(&replica).unwrap_err().is_already_exists());
        assert_eq!(catalog.replicas("/d/x").len(), 1);
        assert_eq!(catalog.replicas("/d/x")[0].status, ReplicaStatus::Available);
        assert_eq!(catalog.replicas("/d/x")[0].file_type, ReplicaFileType::Permanent);

        s.delete_replica(entry.file_id, "srm://se1/x").unwrap();
        assert!(s
            .delete_replica(entry.file_id, "srm://se1/x")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_fault_injection_used_once() {
        let catalog = MemoryCatalog::new();
        catalog.fail_next(CatalogOp::Stat, CatalogError::backend(13, "permission denied"));
        let mut s = session(&catalog);
        assert_eq!(s.stat("/x").unwrap_err().code(), 13);
        assert!(s.stat("/x").unwrap_err().is_not_found());
        assert_eq!(catalog.stats().stats, 2);
    }

    #[test]
    fn test_stat_directory() {
        let catalog = MemoryCatalog::new();
        catalog.insert_entry("/d/x", 1, None);
        let mut s = session(&catalog);
        assert_eq!(s.stat("/d").unwrap_err().code(), EISDIR);
    }

    #[test]
    fn test_session_counting() {
        let catalog = MemoryCatalog::new();
        let mut s = session(&catalog);
        assert_eq!(catalog.stats().open_sessions(), 1);
        s.close();
        assert_eq!(catalog.stats().open_sessions(), 0);
    }
}
