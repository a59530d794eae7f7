//! Raw mode lookup with cache-bypass control

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::mode::RawMode;
use crate::stat::{FileStat, StatSource};

/// Reads mode, owner and group of filesystem objects through a [`StatSource`]
#[derive(Clone)]
pub struct ModeInspector {
    source: Arc<dyn StatSource>,
}

impl ModeInspector {
    pub fn new(source: Arc<dyn StatSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn StatSource> {
        &self.source
    }

    /// Stat `location`, clearing its cache entry first unless `use_cache`
    ///
    /// `None` when the object cannot be reached.
    pub fn stat(&self, location: &Path, use_cache: bool) -> Option<FileStat> {
        if !use_cache {
            self.source.invalidate(location);
        }

        match self.source.stat(location) {
            Ok(stat) => Some(stat),
            Err(e) => {
                debug!("Cannot stat {}: {}", location.display(), e);
                None
            }
        }
    }

    /// Mode word of `location`
    ///
    /// An object whose parent chain cannot be traversed (or that does not
    /// exist) reads as [`RawMode::UNKNOWN`], which grants nothing.
    pub fn raw_mode(&self, location: &Path, use_cache: bool) -> RawMode {
        self.stat(location, use_cache)
            .map(|stat| stat.mode)
            .unwrap_or(RawMode::UNKNOWN)
    }

    pub fn is_directory(&self, location: &Path, use_cache: bool) -> bool {
        self.raw_mode(location, use_cache).is_directory()
    }

    /// Forget cached stat data for `location`
    pub fn clear_stat_cache(&self, location: &Path) {
        self.source.invalidate(location);
    }
}
