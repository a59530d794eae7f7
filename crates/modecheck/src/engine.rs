//! Permission engine façade
//!
//! Wires an identity resolver and a stat source into the classifier, matcher
//! and visibility resolver, and exposes the whole check surface in one place.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::classifier::AccessClassifier;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::identity::{IdentityResolver, ProcessIdentity};
use crate::inspector::ModeInspector;
use crate::matcher::{AccessQuery, PermissionMatcher};
use crate::mode::{AccessClass, RawMode};
use crate::stat::{LocalStatSource, StatSource};
use crate::visibility::{ProcessAccess, Visibility, VisibilityResolver};

/// Advisory permission checks for the current process
#[derive(Clone)]
pub struct PermissionEngine {
    identity: Arc<IdentityResolver>,
    inspector: ModeInspector,
    classifier: AccessClassifier,
    matcher: PermissionMatcher,
    access: ProcessAccess,
    visibility: VisibilityResolver,
    use_cache: bool,
}

impl PermissionEngine {
    /// Build an engine from explicit collaborators
    pub fn new(identity: Arc<IdentityResolver>, source: Arc<dyn StatSource>) -> Self {
        let inspector = ModeInspector::new(source);
        let classifier = AccessClassifier::new(identity.clone(), inspector.clone());
        let matcher = PermissionMatcher::new(inspector.clone());
        let access = ProcessAccess::new(classifier.clone(), matcher.clone());
        let visibility = VisibilityResolver::new(access.clone());

        Self {
            identity,
            inspector,
            classifier,
            matcher,
            access,
            visibility,
            use_cache: true,
        }
    }

    /// Engine over the local filesystem and the platform identity chain
    pub fn local() -> Self {
        Self::new(
            Arc::new(IdentityResolver::platform()),
            Arc::new(LocalStatSource::new()),
        )
    }

    /// Engine over the local filesystem that checks as a fixed identity
    pub fn local_as(identity: ProcessIdentity) -> Self {
        Self::new(
            Arc::new(IdentityResolver::fixed(identity)),
            Arc::new(LocalStatSource::new()),
        )
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        info!(
            providers = ?config.identity_providers,
            stat_cache = config.stat_cache,
            "Building permission engine"
        );

        let mut engine = Self::new(
            Arc::new(IdentityResolver::from_kinds(&config.identity_providers)),
            Arc::new(LocalStatSource::with_cache(config.stat_cache)),
        );
        engine.use_cache = config.use_cache;
        Ok(engine)
    }

    /// Cache policy used by the `*_default` helpers
    pub fn default_use_cache(&self) -> bool {
        self.use_cache
    }

    pub fn identity(&self) -> &Arc<IdentityResolver> {
        &self.identity
    }

    pub fn classifier(&self) -> &AccessClassifier {
        &self.classifier
    }

    pub fn matcher(&self) -> &PermissionMatcher {
        &self.matcher
    }

    pub fn check(&self, query: &AccessQuery) -> Result<bool> {
        self.matcher.check(query)
    }

    pub fn raw_mode(&self, location: &Path, use_cache: bool) -> RawMode {
        self.inspector.raw_mode(location, use_cache)
    }

    pub fn is_directory(&self, location: &Path, use_cache: bool) -> bool {
        self.inspector.is_directory(location, use_cache)
    }

    pub fn is_owned_by_process(&self, location: &Path, use_cache: bool) -> Result<bool> {
        self.classifier.is_owned_by_process(location, use_cache)
    }

    pub fn is_process_in_group(&self, location: &Path, use_cache: bool) -> Result<bool> {
        self.classifier.is_process_in_group(location, use_cache)
    }

    /// Used before read operations
    pub fn is_readable_to_process(&self, location: &Path, use_cache: bool) -> Result<bool> {
        self.access.is_readable_to_process(location, use_cache)
    }

    /// Used before write, delete and rename operations
    pub fn is_writable_to_process(&self, location: &Path, use_cache: bool) -> Result<bool> {
        self.access.is_writable_to_process(location, use_cache)
    }

    /// Used before operations needing both read and write access
    pub fn is_accessible_to_process(&self, location: &Path, use_cache: bool) -> Result<bool> {
        self.access.is_accessible_to_process(location, use_cache)
    }

    pub fn is_readable_to(&self, location: &Path, class: AccessClass, use_cache: bool) -> Result<bool> {
        self.matcher.is_readable_to(location, class, use_cache)
    }

    pub fn is_writable_to(&self, location: &Path, class: AccessClass, use_cache: bool) -> Result<bool> {
        self.matcher.is_writable_to(location, class, use_cache)
    }

    pub fn is_accessible_to(&self, location: &Path, class: AccessClass, use_cache: bool) -> Result<bool> {
        self.matcher.is_accessible_to(location, class, use_cache)
    }

    pub fn is_readable_default(&self, location: &Path) -> Result<bool> {
        self.is_readable_to_process(location, self.use_cache)
    }

    pub fn is_writable_default(&self, location: &Path) -> Result<bool> {
        self.is_writable_to_process(location, self.use_cache)
    }

    pub fn visibility_of(&self, location: &Path) -> Result<Visibility> {
        self.visibility.visibility_of(location)
    }

    /// Forget the cached process identity
    pub fn invalidate_identity_cache(&self) {
        self.identity.invalidate_identity_cache();
    }

    /// Forget cached stat data for `location`
    pub fn clear_stat_cache(&self, location: &Path) {
        self.inspector.clear_stat_cache(location);
    }
}

impl Default for PermissionEngine {
    fn default() -> Self {
        Self::local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::identity::IdentityProviderKind;
    use crate::mode::PermissionLevel;
    use crate::stat::{FileStat, InMemoryStatSource};

    fn engine() -> PermissionEngine {
        let source = Arc::new(InMemoryStatSource::new());
        source.insert("/site", FileStat::directory(0o750, 33, 33));
        source.insert("/site/config.yml", FileStat::file(0o640, 33, 33));
        source.insert("/site/public.css", FileStat::file(0o664, 0, 0));
        PermissionEngine::new(
            Arc::new(IdentityResolver::fixed(ProcessIdentity::new(1000, [33]))),
            source,
        )
    }

    #[test]
    fn test_group_member_checks() {
        let engine = engine();
        let config = Path::new("/site/config.yml");
        assert!(!engine.is_owned_by_process(config, true).unwrap());
        assert!(engine.is_process_in_group(config, true).unwrap());
        // EITHER is strict: owner and group must both carry the bits
        assert!(engine.is_readable_to_process(config, true).unwrap());
        assert!(!engine.is_writable_to_process(config, true).unwrap());
        assert_eq!(engine.visibility_of(config).unwrap(), Visibility::Readonly);
    }

    #[test]
    fn test_class_parametrized_checks() {
        let engine = engine();
        let css = Path::new("/site/public.css");
        assert!(engine.is_accessible_to(css, AccessClass::BOTH, true).unwrap());
        assert!(engine.is_readable_to(css, AccessClass::OTHERS, true).unwrap());
        assert!(!engine.is_writable_to(css, AccessClass::OTHERS, true).unwrap());
    }

    #[test]
    fn test_directory_checks() {
        let engine = engine();
        let site = Path::new("/site");
        assert!(engine.is_directory(site, true));
        assert_eq!(engine.raw_mode(site, true), RawMode(0o040750));
        assert!(engine.is_writable_to_process(site, true).unwrap());
        assert!(!engine.is_readable_to(site, AccessClass::OTHERS, true).unwrap());
    }

    #[test]
    fn test_check_query() {
        let engine = engine();
        let query = AccessQuery::new("/site/public.css", AccessClass::SOMEONE, PermissionLevel::WRITE);
        assert!(engine.check(&query).unwrap());
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = EngineConfig {
            identity_providers: Vec::new(),
            ..EngineConfig::default()
        };
        assert!(matches!(
            PermissionEngine::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_config_applies_cache_policy() {
        let config = EngineConfig {
            use_cache: false,
            identity_providers: vec![IdentityProviderKind::Posix],
            ..EngineConfig::default()
        };
        let engine = PermissionEngine::from_config(&config).unwrap();
        assert!(!engine.default_use_cache());
    }
}
