//! Three-level visibility derived from process access checks

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::AccessClassifier;
use crate::error::{Error, Result};
use crate::matcher::PermissionMatcher;

/// Coarse openness of a filesystem object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Readable and writable by the process
    Public,
    /// Readable but not writable by the process
    Readonly,
    /// Not readable by the process
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Readonly => "readonly",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "readonly" => Ok(Visibility::Readonly),
            "private" => Ok(Visibility::Private),
            other => Err(Error::InvalidVisibility(other.to_string())),
        }
    }
}

/// Access checks against the class that applies to the current process
#[derive(Clone)]
pub struct ProcessAccess {
    classifier: AccessClassifier,
    matcher: PermissionMatcher,
}

impl ProcessAccess {
    pub fn new(classifier: AccessClassifier, matcher: PermissionMatcher) -> Self {
        Self {
            classifier,
            matcher,
        }
    }

    pub fn is_readable_to_process(&self, location: &Path, use_cache: bool) -> Result<bool> {
        let class = self.classifier.class_for(location, use_cache)?;
        self.matcher.is_readable_to(location, class, use_cache)
    }

    pub fn is_writable_to_process(&self, location: &Path, use_cache: bool) -> Result<bool> {
        let class = self.classifier.class_for(location, use_cache)?;
        self.matcher.is_writable_to(location, class, use_cache)
    }

    pub fn is_accessible_to_process(&self, location: &Path, use_cache: bool) -> Result<bool> {
        let class = self.classifier.class_for(location, use_cache)?;
        self.matcher.is_accessible_to(location, class, use_cache)
    }
}

/// Classifies objects as public, readonly or private for the current process
#[derive(Clone)]
pub struct VisibilityResolver {
    access: ProcessAccess,
}

impl VisibilityResolver {
    pub fn new(access: ProcessAccess) -> Self {
        Self { access }
    }

    /// Visibility of `location`, read from fresh stat data
    ///
    /// Full access is tested first, so an accessible object is never
    /// reported as merely readable.
    pub fn visibility_of(&self, location: &Path) -> Result<Visibility> {
        self.access.matcher.inspector().clear_stat_cache(location);

        let visibility = if self.access.is_accessible_to_process(location, true)? {
            Visibility::Public
        } else if self.access.is_readable_to_process(location, true)? {
            Visibility::Readonly
        } else {
            Visibility::Private
        };

        debug!("Visibility of {} is {}", location.display(), visibility);
        Ok(visibility)
    }
}
