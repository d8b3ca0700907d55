//! Catalog client abstraction
//!
//! A [`CatalogConnector`] opens one [`CatalogSession`] per protocol run. The
//! session is wrapped in a [`SessionGuard`] that closes it on every exit path.

use crate::models::{CatalogEntry, NewReplica, ReplicaInfo};
use gridlink_core::location::parent_dir;
use gridlink_core::CatalogError;
use std::ops::{Deref, DerefMut};
use tracing::{debug, warn};
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Catalog operation, attached to failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogOp {
    Connect,
    Stat,
    Access,
    Mkdir,
    Create,
    SetMetadata,
    AddReplica,
    DeleteReplica,
}

impl std::fmt::Display for CatalogOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Stat => write!(f, "stat"),
            Self::Access => write!(f, "access"),
            Self::Mkdir => write!(f, "mkdir"),
            Self::Create => write!(f, "create"),
            Self::SetMetadata => write!(f, "set metadata"),
            Self::AddReplica => write!(f, "add replica"),
            Self::DeleteReplica => write!(f, "delete replica"),
        }
    }
}

/// Session with one catalog host.
///
/// Every call blocks until the catalog answers.
pub trait CatalogSession: Send {
    /// Catalog host this session talks to
    fn host(&self) -> &str;

    fn stat(&mut self, path: &str) -> Result<CatalogEntry>;

    /// Whether a file or directory exists at `path`
    fn exists(&mut self, path: &str) -> Result<bool>;

    /// Create one directory; fails with `AlreadyExists` if present
    fn mkdir(&mut self, path: &str, mode: u32) -> Result<()>;

    fn create(&mut self, path: &str, guid: Uuid, mode: u32) -> Result<()>;

    fn set_metadata(&mut self, guid: Uuid, info: &ReplicaInfo) -> Result<()>;

    fn add_replica(&mut self, replica: &NewReplica) -> Result<()>;

    fn delete_replica(&mut self, file_id: u64, url: &str) -> Result<()>;

    /// Release the session
    fn close(&mut self);

    /// Create `path` and every missing ancestor, top down.
    ///
    /// Walks up until an existing directory is found, so directories that
    /// are already present never receive a mkdir. One created concurrently
    /// by another client is not an error.
    fn mkdir_recursive(&mut self, path: &str, mode: u32) -> Result<()> {
        let mut missing = Vec::new();
        let mut current = Some(path.trim_end_matches('/'));
        while let Some(dir) = current {
            if dir.is_empty() || self.exists(dir)? {
                break;
            }
            missing.push(dir);
            current = parent_dir(dir);
        }

        for dir in missing.into_iter().rev() {
            match self.mkdir(dir, mode) {
                Ok(()) => debug!(path = %dir, mode = %format!("{:o}", mode), "Created directory"),
                Err(e) if e.is_already_exists() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Opens catalog sessions
pub trait CatalogConnector: Send + Sync {
    fn connect(&self, host: &str) -> Result<Box<dyn CatalogSession>>;
}

/// Closes the wrapped session when dropped
pub struct SessionGuard {
    session: Box<dyn CatalogSession>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn CatalogSession>) -> Self {
        Self { session }
    }

    /// Open a session through `connector`
    pub fn open(connector: &dyn CatalogConnector, host: &str) -> Result<Self> {
        let session = connector.connect(host).map_err(|e| {
            warn!(host = %host, error = %e, "Failed to open catalog session");
            e
        })?;
        Ok(Self::new(session))
    }
}

impl Deref for SessionGuard {
    type Target = dyn CatalogSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        debug!(host = %self.session.host(), "Closing catalog session");
        self.session.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Session that only knows directories
    struct DirSession {
        dirs: HashSet<String>,
        mkdirs: Vec<String>,
        /// Reported missing, then created by someone else before our mkdir
        racing: HashSet<String>,
        closed: Arc<AtomicUsize>,
    }

    impl DirSession {
        fn new(existing: &[&str], closed: Arc<AtomicUsize>) -> Self {
            Self {
                dirs: existing.iter().map(|d| d.to_string()).collect(),
                mkdirs: Vec::new(),
                racing: HashSet::new(),
                closed,
            }
        }
    }

    impl CatalogSession for DirSession {
        fn host(&self) -> &str {
            "cat"
        }

        fn stat(&mut self, path: &str) -> Result<CatalogEntry> {
            Err(CatalogError::NotFound(path.to_string()))
        }

        fn exists(&mut self, path: &str) -> Result<bool> {
            Ok(self.dirs.contains(path))
        }

        fn mkdir(&mut self, path: &str, _mode: u32) -> Result<()> {
            self.mkdirs.push(path.to_string());
            if self.racing.remove(path) || !self.dirs.insert(path.to_string()) {
                return Err(CatalogError::AlreadyExists(path.to_string()));
            }
            Ok(())
        }

        fn create(&mut self, _path: &str, _guid: Uuid, _mode: u32) -> Result<()> {
            Ok(())
        }

        fn set_metadata(&mut self, _guid: Uuid, _info: &ReplicaInfo) -> Result<()> {
            Ok(())
        }

        fn add_replica(&mut self, _replica: &NewReplica) -> Result<()> {
            Ok(())
        }

        fn delete_replica(&mut self, _file_id: u64, _url: &str) -> Result<()> {
            Ok(())
        }

        fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_mkdir_recursive_top_down() {
        let mut session = DirSession::new(&[], Arc::default());
        session.mkdir_recursive("/a/b/c", 0o755).unwrap();
        assert_eq!(session.mkdirs, vec!["/a", "/a/b", "/a/b/c"]);
    }

    #[test]
    fn test_mkdir_recursive_skips_existing_ancestors() {
        let mut session = DirSession::new(&["/a", "/a/b"], Arc::default());
        session.mkdir_recursive("/a/b/c/", 0o755).unwrap();
        assert_eq!(session.mkdirs, vec!["/a/b/c"]);

        // everything present now
        session.mkdir_recursive("/a/b/c", 0o755).unwrap();
        assert_eq!(session.mkdirs, vec!["/a/b/c"]);
    }

    #[test]
    fn test_mkdir_recursive_concurrent_create_is_ok() {
        let mut session = DirSession::new(&["/a"], Arc::default());
        session.racing.insert("/a/b".to_string());
        session.mkdir_recursive("/a/b/c", 0o755).unwrap();
        assert_eq!(session.mkdirs, vec!["/a/b", "/a/b/c"]);
    }

    #[test]
    fn test_guard_closes_once() {
        let closed = Arc::new(AtomicUsize::new(0));
        {
            let mut guard = SessionGuard::new(Box::new(DirSession::new(&[], closed.clone())));
            guard.mkdir("/x", 0o755).unwrap();
            assert_eq!(guard.host(), "cat");
        }
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_op_display() {
        assert_eq!(CatalogOp::AddReplica.to_string(), "add replica");
        assert_eq!(CatalogOp::Stat.to_string(), "stat");
    }
}
