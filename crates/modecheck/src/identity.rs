//! Process identity resolution
//!
//! The user id and group ids of the current process are answered by an
//! ordered chain of [`IdentityProvider`]s. The first provider that can answer
//! wins; the answer is cached by the [`IdentityResolver`] until
//! [`IdentityResolver::invalidate_identity_cache`] is called, e.g. after a
//! privilege drop in a long-lived process.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// User id and group id set of a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessIdentity {
    pub user_id: u32,
    pub group_ids: BTreeSet<u32>,
}

impl ProcessIdentity {
    pub fn new(user_id: u32, group_ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            user_id,
            group_ids: group_ids.into_iter().collect(),
        }
    }

    pub fn in_group(&self, gid: u32) -> bool {
        self.group_ids.contains(&gid)
    }
}

/// One platform mechanism for querying the process identity
///
/// Returning `None` means the mechanism is unavailable here, and the
/// resolver moves on to the next provider.
pub trait IdentityProvider: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &'static str;

    fn user_id(&self) -> Option<u32> {
        None
    }

    fn group_ids(&self) -> Option<BTreeSet<u32>> {
        None
    }
}

/// Provider kinds that can be named in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityProviderKind {
    /// Effective uid and the supplementary group list
    Posix,
    /// Effective gid only
    PrimaryGroup,
    /// Owner and group of the running executable
    ExecutableOwner,
}

impl IdentityProviderKind {
    /// Build the platform provider for this kind
    pub fn provider(self) -> Arc<dyn IdentityProvider> {
        match self {
            IdentityProviderKind::Posix => Arc::new(PosixIdentity),
            IdentityProviderKind::PrimaryGroup => Arc::new(PrimaryGroupIdentity),
            IdentityProviderKind::ExecutableOwner => Arc::new(ExecutableOwnerIdentity),
        }
    }

    /// Preferred order, most authoritative first
    pub fn default_chain() -> Vec<IdentityProviderKind> {
        vec![
            IdentityProviderKind::Posix,
            IdentityProviderKind::PrimaryGroup,
            IdentityProviderKind::ExecutableOwner,
        ]
    }
}

/// `geteuid(2)` and `getgroups(2)`
pub struct PosixIdentity;

impl IdentityProvider for PosixIdentity {
    fn name(&self) -> &'static str {
        "posix"
    }

    #[cfg(unix)]
    fn user_id(&self) -> Option<u32> {
        Some(nix::unistd::geteuid().as_raw())
    }

    #[cfg(all(unix, not(target_vendor = "apple")))]
    fn group_ids(&self) -> Option<BTreeSet<u32>> {
        match nix::unistd::getgroups() {
            // An empty list says nothing about the egid; let the next provider answer
            Ok(groups) if groups.is_empty() => None,
            Ok(groups) => Some(groups.into_iter().map(|gid| gid.as_raw()).collect()),
            Err(e) => {
                warn!(error = %e, "getgroups failed");
                None
            }
        }
    }
}

/// `getegid(2)`
pub struct PrimaryGroupIdentity;

impl IdentityProvider for PrimaryGroupIdentity {
    fn name(&self) -> &'static str {
        "primary_group"
    }

    #[cfg(unix)]
    fn group_ids(&self) -> Option<BTreeSet<u32>> {
        Some(BTreeSet::from([nix::unistd::getegid().as_raw()]))
    }
}

/// Owner of the running executable, the last-resort "my uid / my gid" answer
pub struct ExecutableOwnerIdentity;

impl ExecutableOwnerIdentity {
    #[cfg(unix)]
    fn metadata() -> Option<std::fs::Metadata> {
        let exe = std::env::current_exe().ok()?;
        std::fs::metadata(exe).ok()
    }
}

impl IdentityProvider for ExecutableOwnerIdentity {
    fn name(&self) -> &'static str {
        "executable_owner"
    }

    #[cfg(unix)]
    fn user_id(&self) -> Option<u32> {
        use std::os::unix::fs::MetadataExt;
        Self::metadata().map(|m| m.uid())
    }

    #[cfg(unix)]
    fn group_ids(&self) -> Option<BTreeSet<u32>> {
        use std::os::unix::fs::MetadataExt;
        Self::metadata().map(|m| BTreeSet::from([m.gid()]))
    }
}

/// Fixed identity, for tests and for hosts that impersonate another user
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    identity: ProcessIdentity,
}

impl StaticIdentity {
    pub fn new(identity: ProcessIdentity) -> Self {
        Self { identity }
    }
}

impl IdentityProvider for StaticIdentity {
    fn name(&self) -> &'static str {
        "static"
    }

    fn user_id(&self) -> Option<u32> {
        Some(self.identity.user_id)
    }

    fn group_ids(&self) -> Option<BTreeSet<u32>> {
        Some(self.identity.group_ids.clone())
    }
}

#[derive(Debug, Default)]
struct CachedIdentity {
    user_id: Option<u32>,
    group_ids: Option<BTreeSet<u32>>,
}

/// Resolves and caches the identity of the current process
pub struct IdentityResolver {
    providers: Vec<Arc<dyn IdentityProvider>>,
    cache: RwLock<CachedIdentity>,
}

impl IdentityResolver {
    /// Create a resolver over an ordered provider chain
    pub fn new(providers: Vec<Arc<dyn IdentityProvider>>) -> Self {
        Self {
            providers,
            cache: RwLock::new(CachedIdentity::default()),
        }
    }

    /// Resolver over the platform chain (posix, primary group, executable owner)
    pub fn platform() -> Self {
        Self::from_kinds(&IdentityProviderKind::default_chain())
    }

    pub fn from_kinds(kinds: &[IdentityProviderKind]) -> Self {
        Self::new(kinds.iter().map(|kind| kind.provider()).collect())
    }

    /// Resolver that always answers with the given identity
    pub fn fixed(identity: ProcessIdentity) -> Self {
        let provider: Arc<dyn IdentityProvider> = Arc::new(StaticIdentity::new(identity));
        Self::new(vec![provider])
    }

    /// Effective user id of the process
    pub fn current_user_id(&self) -> Result<u32> {
        if let Some(uid) = self.cache.read().user_id {
            return Ok(uid);
        }

        let mut cache = self.cache.write();
        // Another thread may have resolved it while we waited
        if let Some(uid) = cache.user_id {
            return Ok(uid);
        }

        for provider in &self.providers {
            if let Some(uid) = provider.user_id() {
                debug!(provider = provider.name(), uid, "Resolved process user id");
                cache.user_id = Some(uid);
                return Ok(uid);
            }
        }

        Err(Error::Environment { fact: "user id" })
    }

    /// Group ids the process is a member of
    pub fn current_group_ids(&self) -> Result<BTreeSet<u32>> {
        if let Some(gids) = self.cache.read().group_ids.as_ref() {
            return Ok(gids.clone());
        }

        let mut cache = self.cache.write();
        if let Some(gids) = cache.group_ids.as_ref() {
            return Ok(gids.clone());
        }

        for provider in &self.providers {
            if let Some(gids) = provider.group_ids() {
                debug!(provider = provider.name(), count = gids.len(), "Resolved process group ids");
                cache.group_ids = Some(gids.clone());
                return Ok(gids);
            }
        }

        Err(Error::Environment { fact: "group id" })
    }

    /// Whether the process is a member of `gid`
    pub fn is_member_of(&self, gid: u32) -> Result<bool> {
        if let Some(gids) = self.cache.read().group_ids.as_ref() {
            return Ok(gids.contains(&gid));
        }
        Ok(self.current_group_ids()?.contains(&gid))
    }

    pub fn identity(&self) -> Result<ProcessIdentity> {
        Ok(ProcessIdentity {
            user_id: self.current_user_id()?,
            group_ids: self.current_group_ids()?,
        })
    }

    /// Forget the cached identity; the next query re-resolves it
    pub fn invalidate_identity_cache(&self) {
        let mut cache = self.cache.write();
        *cache = CachedIdentity::default();
        info!("Process identity cache invalidated");
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::platform()
    }
}
