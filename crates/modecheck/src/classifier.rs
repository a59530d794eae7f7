//! Owner / group / other classification of the current process

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::inspector::ModeInspector;
use crate::mode::AccessClass;

/// Decides which permission class applies to the current process
#[derive(Clone)]
pub struct AccessClassifier {
    identity: Arc<IdentityResolver>,
    inspector: ModeInspector,
}

impl AccessClassifier {
    pub fn new(identity: Arc<IdentityResolver>, inspector: ModeInspector) -> Self {
        Self {
            identity,
            inspector,
        }
    }

    /// Whether the process owns `location`
    ///
    /// An object that cannot be stat-ed is owned by nobody.
    pub fn is_owned_by_process(&self, location: &Path, use_cache: bool) -> Result<bool> {
        let Some(stat) = self.inspector.stat(location, use_cache) else {
            return Ok(false);
        };
        Ok(stat.uid == self.identity.current_user_id()?)
    }

    /// Whether the process is a member of the group of `location`
    pub fn is_process_in_group(&self, location: &Path, use_cache: bool) -> Result<bool> {
        let Some(stat) = self.inspector.stat(location, use_cache) else {
            return Ok(false);
        };
        self.identity.is_member_of(stat.gid)
    }

    /// [`AccessClass::EITHER`] for the owner or a group member, else [`AccessClass::OTHERS`]
    pub fn class_for(&self, location: &Path, use_cache: bool) -> Result<AccessClass> {
        if self.is_owned_by_process(location, use_cache)?
            || self.is_process_in_group(location, use_cache)?
        {
            Ok(AccessClass::EITHER)
        } else {
            Ok(AccessClass::OTHERS)
        }
    }
}
