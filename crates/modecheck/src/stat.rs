//! Stat data sources
//!
//! The engine never calls `stat(2)` directly. It reads through a
//! [`StatSource`], which owns any caching and is asked to drop a path's entry
//! when a caller wants fresh data.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mode::{RawMode, S_IFDIR, S_IFREG};

/// The subset of `struct stat` the engine needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub mode: RawMode,
    pub uid: u32,
    pub gid: u32,
}

impl FileStat {
    pub fn new(mode: RawMode, uid: u32, gid: u32) -> Self {
        Self { mode, uid, gid }
    }

    /// Regular file with the given permission bits
    pub fn file(permissions: u32, uid: u32, gid: u32) -> Self {
        Self::new(RawMode::new(S_IFREG, permissions), uid, gid)
    }

    /// Directory with the given permission bits
    pub fn directory(permissions: u32, uid: u32, gid: u32) -> Self {
        Self::new(RawMode::new(S_IFDIR, permissions), uid, gid)
    }
}

/// Collaborator that answers stat queries for paths
pub trait StatSource: Send + Sync {
    /// Stat `location`, following symlinks
    fn stat(&self, location: &Path) -> io::Result<FileStat>;

    /// Drop any cached data for `location`
    fn invalidate(&self, location: &Path);

    /// Drop all cached data
    fn clear(&self) {}
}

/// Stat source backed by the local filesystem
pub struct LocalStatSource {
    cache: Option<RwLock<HashMap<PathBuf, FileStat>>>,
}

impl LocalStatSource {
    /// Create a source that caches results per path
    pub fn new() -> Self {
        Self {
            cache: Some(RwLock::new(HashMap::new())),
        }
    }

    /// Create a source that stats on every call
    pub fn uncached() -> Self {
        Self { cache: None }
    }

    pub fn with_cache(enabled: bool) -> Self {
        if enabled {
            Self::new()
        } else {
            Self::uncached()
        }
    }

    /// Number of cached entries
    pub fn cached_len(&self) -> usize {
        self.cache.as_ref().map(|c| c.read().len()).unwrap_or(0)
    }

    #[cfg(unix)]
    fn stat_uncached(location: &Path) -> io::Result<FileStat> {
        use std::os::unix::fs::MetadataExt;

        let metadata = std::fs::metadata(location)?;
        Ok(FileStat {
            mode: RawMode(metadata.mode()),
            uid: metadata.uid(),
            gid: metadata.gid(),
        })
    }

    #[cfg(not(unix))]
    fn stat_uncached(_location: &Path) -> io::Result<FileStat> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "unix permission bits are not available on this platform",
        ))
    }
}

impl Default for LocalStatSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StatSource for LocalStatSource {
    fn stat(&self, location: &Path) -> io::Result<FileStat> {
        let Some(cache) = &self.cache else {
            return Self::stat_uncached(location);
        };

        if let Some(stat) = cache.read().get(location) {
            return Ok(*stat);
        }

        // Failures are not cached, so a path that appears later is seen
        let stat = Self::stat_uncached(location)?;
        cache.write().insert(location.to_path_buf(), stat);
        Ok(stat)
    }

    fn invalidate(&self, location: &Path) {
        if let Some(cache) = &self.cache {
            if cache.write().remove(location).is_some() {
                debug!("Cleared stat cache for {}", location.display());
            }
        }
    }

    fn clear(&self) {
        if let Some(cache) = &self.cache {
            cache.write().clear();
        }
    }
}

/// Stat source over fabricated entries (for testing and embedding)
pub struct InMemoryStatSource {
    entries: RwLock<HashMap<PathBuf, FileStat>>,
}

impl InMemoryStatSource {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Add or replace the entry for `location`
    pub fn insert<P: AsRef<Path>>(&self, location: P, stat: FileStat) {
        self.entries.write().insert(location.as_ref().to_path_buf(), stat);
    }

    pub fn remove<P: AsRef<Path>>(&self, location: P) -> Option<FileStat> {
        self.entries.write().remove(location.as_ref())
    }
}

impl Default for InMemoryStatSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StatSource for InMemoryStatSource {
    fn stat(&self, location: &Path) -> io::Result<FileStat> {
        self.entries.read().get(location).copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no entry for {}", location.display()),
            )
        })
    }

    fn invalidate(&self, _location: &Path) {}
}
