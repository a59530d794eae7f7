//! Root-prefixed local filesystem adapter
//!
//! Consults the permission engine before mutating objects and refuses
//! (returns `Ok(false)`) when the process lacks access. The checks are
//! advisory; the OS still has the final word on every operation.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::config::VisibilityPermissions;
use crate::engine::PermissionEngine;
use crate::error::{Error, Result};
use crate::visibility::Visibility;

/// Local adapter rooted at a directory
pub struct LocalAdapter {
    root: PathBuf,
    engine: PermissionEngine,
    permissions: VisibilityPermissions,
}

impl LocalAdapter {
    /// Create an adapter, creating `root` if it does not exist
    pub fn new<P: AsRef<Path>>(
        root: P,
        engine: PermissionEngine,
        permissions: VisibilityPermissions,
    ) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            create_dir_with_mode(root, 0o755)?;
        }

        Ok(Self {
            root: root.canonicalize()?,
            engine,
            permissions,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn engine(&self) -> &PermissionEngine {
        &self.engine
    }

    /// Resolve `path` against the root
    ///
    /// Leading separators are ignored; `..` components are rejected.
    pub fn apply_path_prefix(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches(|c| c == '/' || c == '\\'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(Error::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Create `location` and its parents if missing
    pub fn ensure_directory(&self, location: &Path) -> Result<()> {
        if !location.is_dir() {
            debug!("Creating directory {}", location.display());
            create_dir_with_mode(location, 0o755)?;
        }
        Ok(())
    }

    fn ensure_parent(&self, location: &Path) -> Result<()> {
        match location.parent() {
            Some(parent) => self.ensure_directory(parent),
            None => Ok(()),
        }
    }

    pub fn visibility(&self, path: &str) -> Result<Visibility> {
        let location = self.apply_path_prefix(path)?;
        self.engine.visibility_of(&location)
    }

    /// Apply the configured mode for `visibility`
    pub fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        let location = self.apply_path_prefix(path)?;
        let mode = self.permissions.mode_for(visibility);
        set_mode(&location, mode)?;
        self.engine.clear_stat_cache(&location);
        debug!("Set {} to {} ({:o})", location.display(), visibility, mode);
        Ok(())
    }

    /// Write `contents`, creating parent directories first
    pub fn write(&self, path: &str, contents: &[u8]) -> Result<u64> {
        let location = self.apply_path_prefix(path)?;
        self.ensure_parent(&location)?;
        fs::write(&location, contents)?;
        self.engine.clear_stat_cache(&location);
        Ok(contents.len() as u64)
    }

    /// Overwrite an existing object; refused when not writable to the process
    pub fn update(&self, path: &str, contents: &[u8]) -> Result<bool> {
        let location = self.apply_path_prefix(path)?;
        if !self.engine.is_writable_to_process(&location, false)? {
            warn!("Refusing update of {}: not writable", location.display());
            return Ok(false);
        }

        fs::write(&location, contents)?;
        Ok(true)
    }

    pub fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let location = self.apply_path_prefix(path)?;
        if !self.engine.is_readable_to_process(&location, false)? {
            return Ok(None);
        }
        Ok(Some(fs::read(&location)?))
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        let source = self.apply_path_prefix(from)?;
        let destination = self.apply_path_prefix(to)?;
        self.ensure_parent(&destination)?;
        fs::rename(&source, &destination)?;
        self.engine.clear_stat_cache(&source);
        self.engine.clear_stat_cache(&destination);
        Ok(())
    }

    pub fn copy(&self, from: &str, to: &str) -> Result<u64> {
        let source = self.apply_path_prefix(from)?;
        let destination = self.apply_path_prefix(to)?;
        self.ensure_parent(&destination)?;
        let size = fs::copy(&source, &destination)?;
        self.engine.clear_stat_cache(&destination);
        Ok(size)
    }

    /// Remove a file; refused when not writable to the process
    pub fn delete(&self, path: &str) -> Result<bool> {
        let location = self.apply_path_prefix(path)?;
        if !self.engine.is_writable_to_process(&location, false)? {
            warn!("Refusing delete of {}: not writable", location.display());
            return Ok(false);
        }

        fs::remove_file(&location)?;
        self.engine.clear_stat_cache(&location);
        Ok(true)
    }

    pub fn create_dir(&self, path: &str) -> Result<PathBuf> {
        let location = self.apply_path_prefix(path)?;
        self.ensure_directory(&location)?;
        Ok(location)
    }

    /// Remove a directory tree; refused for non-directories and when not writable
    pub fn delete_dir(&self, path: &str) -> Result<bool> {
        let location = self.apply_path_prefix(path)?;
        if !self.engine.is_directory(&location, false)
            || !self.engine.is_writable_to_process(&location, true)?
        {
            warn!("Refusing delete of directory {}", location.display());
            return Ok(false);
        }

        fs::remove_dir_all(&location)?;
        self.engine.clear_stat_cache(&location);
        Ok(true)
    }
}

#[cfg(unix)]
fn create_dir_with_mode(location: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(location)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_dir_with_mode(location: &Path, _mode: u32) -> Result<()> {
    fs::create_dir_all(location)?;
    Ok(())
}

#[cfg(unix)]
fn set_mode(location: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(location, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(location: &Path, mode: u32) -> Result<()> {
    let mut permissions = fs::metadata(location)?.permissions();
    permissions.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(location, permissions)?;
    Ok(())
}
