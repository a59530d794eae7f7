//! Mode mask construction and matching
//!
//! A check expands an [`AccessClass`] selector and a [`PermissionLevel`] digit
//! into a mode mask: every selected class gets the full level in its own
//! three-bit field. `BOTH` with `READ_WRITE` is `0o660`, `OTHERS` with
//! `EXECUTE` is `0o001`.
//!
//! Directories are the naming trap here. For a directory any non-empty level
//! collapses to `EXECUTE`, so "is readable" and "is writable" on a directory
//! actually ask whether the directory can be traversed.

use std::path::{Path, PathBuf};

use tracing::{error, trace};

use crate::error::{Error, Result};
use crate::inspector::ModeInspector;
use crate::mode::{AccessClass, PermissionLevel, RawMode};

/// Input of a single permission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessQuery {
    pub location: PathBuf,
    pub class: AccessClass,
    pub level: PermissionLevel,
    /// All requested bits must be present; ignored when `class` is relaxed
    pub strict: bool,
    pub use_cache: bool,
}

impl AccessQuery {
    /// Strict, cached query
    pub fn new<P: Into<PathBuf>>(location: P, class: AccessClass, level: PermissionLevel) -> Self {
        Self {
            location: location.into(),
            class,
            level,
            strict: true,
            use_cache: true,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }
}

/// Place `level` into the permission field of each class selected by `class`
///
/// The relaxed flag is ignored; only the low three bits select classes.
pub fn build_mode_mask(class: AccessClass, level: PermissionLevel) -> u32 {
    const FIELDS: [(AccessClass, u32); 3] = [
        (AccessClass::OWNER, 6),
        (AccessClass::GROUP, 3),
        (AccessClass::OTHERS, 0),
    ];

    let level = u32::from(level.bits() & 0o7);
    FIELDS
        .iter()
        .filter(|(selector, _)| class.classes().contains(*selector))
        .fold(0, |mask, (_, shift)| mask | (level << shift))
}

/// Test a mode word against a mask
///
/// Strict matching needs every mask bit; relaxed matching needs any one.
/// An empty mask would match everything strictly, so it is rejected.
pub fn test_mode_mask(mode: RawMode, mask: u32, strict: bool) -> Result<bool> {
    if mask == 0 {
        return Err(Error::InvalidModeMask(
            "mask must be greater than zero".to_string(),
        ));
    }

    let matched = mode.bits() & mask;
    Ok(if strict { matched == mask } else { matched != 0 })
}

/// Tests class/level combinations against the mode of filesystem objects
#[derive(Clone)]
pub struct PermissionMatcher {
    inspector: ModeInspector,
}

impl PermissionMatcher {
    pub fn new(inspector: ModeInspector) -> Self {
        Self { inspector }
    }

    pub fn inspector(&self) -> &ModeInspector {
        &self.inspector
    }

    /// Run a check
    ///
    /// Returns [`Error::InvalidModeMask`] when the selector or level is
    /// empty. An unreachable object is a plain `false`.
    pub fn check(&self, query: &AccessQuery) -> Result<bool> {
        let mut strict = query.strict;
        let mut class = query.class;
        if class.is_relaxed() {
            strict = false;
            class = class.classes();
        }

        let location = query.location.as_path();
        let mut level = query.level;
        if !level.is_empty() && self.inspector.is_directory(location, query.use_cache) {
            level = PermissionLevel::EXECUTE;
        }

        let mask = build_mode_mask(class, level);
        if mask == 0 {
            error!(class = %query.class, level = %query.level, "Rejected empty mode mask");
            return Err(Error::InvalidModeMask(format!(
                "class {} with level {} selects no permission bits",
                query.class, query.level
            )));
        }

        let mode = self.inspector.raw_mode(location, query.use_cache);
        let granted = test_mode_mask(mode, mask, strict)?;
        trace!(
            location = %location.display(),
            mode = %mode,
            mask = %format!("{:03o}", mask),
            strict,
            granted,
            "Checked mode mask"
        );
        Ok(granted)
    }

    fn check_level(
        &self,
        location: &Path,
        class: AccessClass,
        level: PermissionLevel,
        use_cache: bool,
    ) -> Result<bool> {
        self.check(&AccessQuery::new(location, class, level).use_cache(use_cache))
    }

    /// Read access for `class` (execute for directories)
    pub fn is_readable_to(&self, location: &Path, class: AccessClass, use_cache: bool) -> Result<bool> {
        self.check_level(location, class, PermissionLevel::READ, use_cache)
    }

    /// Write access for `class` (execute for directories)
    pub fn is_writable_to(&self, location: &Path, class: AccessClass, use_cache: bool) -> Result<bool> {
        self.check_level(location, class, PermissionLevel::WRITE, use_cache)
    }

    /// Read-write access for `class` (execute for directories)
    pub fn is_accessible_to(&self, location: &Path, class: AccessClass, use_cache: bool) -> Result<bool> {
        self.check_level(location, class, PermissionLevel::READ_WRITE, use_cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stat::{FileStat, InMemoryStatSource};
    use std::sync::Arc;

    fn matcher(entries: &[(&str, FileStat)]) -> PermissionMatcher {
        let source = Arc::new(InMemoryStatSource::new());
        for (path, stat) in entries {
            source.insert(path, *stat);
        }
        PermissionMatcher::new(ModeInspector::new(source))
    }

    fn level(bits: u8) -> PermissionLevel {
        PermissionLevel::from_bits(bits).unwrap()
    }

    #[test]
    fn test_build_mode_mask() {
        assert_eq!(build_mode_mask(AccessClass::BOTH, PermissionLevel::READ_WRITE), 0o660);
        assert_eq!(build_mode_mask(AccessClass::ALL, PermissionLevel::ALL), 0o777);
        assert_eq!(build_mode_mask(AccessClass::OWNER, PermissionLevel::READ), 0o400);
        assert_eq!(build_mode_mask(AccessClass::GROUP, PermissionLevel::WRITE), 0o020);
        assert_eq!(build_mode_mask(AccessClass::OTHERS, PermissionLevel::EXECUTE), 0o001);
        assert_eq!(build_mode_mask(AccessClass::SOMEONE, PermissionLevel::READ), 0o444);
        assert_eq!(build_mode_mask(AccessClass::from_bits(0).unwrap(), PermissionLevel::ALL), 0);
        assert_eq!(build_mode_mask(AccessClass::ALL, level(0)), 0);
    }

    #[test]
    fn test_test_mode_mask() {
        assert!(test_mode_mask(RawMode(0o100644), 0o640, true).unwrap());
        assert!(!test_mode_mask(RawMode(0o100644), 0o660, true).unwrap());
        assert!(test_mode_mask(RawMode(0o100644), 0o660, false).unwrap());
        assert!(!test_mode_mask(RawMode(0o100600), 0o066, false).unwrap());
        assert!(test_mode_mask(RawMode(0o100644), 0, true).is_err());
    }

    #[test]
    fn test_strict_owner_read_write() {
        let matcher = matcher(&[("/f", FileStat::file(0o640, 0, 0))]);
        let f = Path::new("/f");
        assert!(matcher.is_accessible_to(f, AccessClass::OWNER, true).unwrap());
        assert!(!matcher.is_accessible_to(f, AccessClass::GROUP, true).unwrap());
        assert!(matcher.is_readable_to(f, AccessClass::BOTH, true).unwrap());
        assert!(!matcher.is_writable_to(f, AccessClass::BOTH, true).unwrap());
        assert!(!matcher.is_readable_to(f, AccessClass::OTHERS, true).unwrap());
    }

    #[test]
    fn test_relaxed_someone_execute() {
        let matcher = matcher(&[("/bin/tool", FileStat::file(0o010, 0, 0))]);
        let relaxed = AccessQuery::new("/bin/tool", AccessClass::SOMEONE, PermissionLevel::EXECUTE);
        assert!(matcher.check(&relaxed).unwrap());

        let strict = AccessQuery::new("/bin/tool", AccessClass::ALL, PermissionLevel::EXECUTE);
        assert!(!matcher.check(&strict).unwrap());
    }

    #[test]
    fn test_relaxed_flag_overrides_strict() {
        let matcher = matcher(&[("/f", FileStat::file(0o400, 0, 0))]);
        let query = AccessQuery::new("/f", AccessClass::BOTH.relaxed(), PermissionLevel::READ)
            .strict(true);
        assert!(matcher.check(&query).unwrap());
        let query = AccessQuery::new("/f", AccessClass::BOTH, PermissionLevel::READ);
        assert!(!matcher.check(&query).unwrap());
    }

    #[test]
    fn test_plain_class_honors_relaxed_request() {
        let matcher = matcher(&[("/f", FileStat::file(0o004, 0, 0))]);
        let query = AccessQuery::new("/f", AccessClass::ALL, PermissionLevel::READ).strict(false);
        assert!(matcher.check(&query).unwrap());
    }

    #[test]
    fn test_directory_levels_collapse_to_execute() {
        let matcher = matcher(&[("/www", FileStat::directory(0o711, 0, 0))]);
        let dir = Path::new("/www");
        assert!(matcher.is_accessible_to(dir, AccessClass::OWNER, true).unwrap());
        assert!(matcher.is_accessible_to(dir, AccessClass::OTHERS, true).unwrap());
        assert!(matcher.is_readable_to(dir, AccessClass::GROUP, true).unwrap());
        assert!(matcher.is_writable_to(dir, AccessClass::ALL, true).unwrap());
    }

    #[test]
    fn test_directory_without_execute() {
        let matcher = matcher(&[("/drop", FileStat::directory(0o766, 0, 0))]);
        let dir = Path::new("/drop");
        assert!(matcher.is_accessible_to(dir, AccessClass::OWNER, true).unwrap());
        assert!(!matcher.is_readable_to(dir, AccessClass::GROUP, true).unwrap());
        assert!(!matcher.is_readable_to(dir, AccessClass::OTHERS, true).unwrap());
    }

    #[test]
    fn test_empty_class_or_level_is_invariant_error() {
        let matcher = matcher(&[("/f", FileStat::file(0o777, 0, 0))]);

        let query = AccessQuery::new("/f", AccessClass::from_bits(0).unwrap(), PermissionLevel::READ);
        assert!(matches!(matcher.check(&query), Err(Error::InvalidModeMask(_))));

        let query = AccessQuery::new("/f", AccessClass::ALL, level(0));
        assert!(matches!(matcher.check(&query), Err(Error::InvalidModeMask(_))));

        // The relaxed flag alone selects no class
        let query = AccessQuery::new("/f", AccessClass::from_bits(0b1000).unwrap(), PermissionLevel::READ);
        assert!(matches!(matcher.check(&query), Err(Error::InvalidModeMask(_))));
    }

    #[test]
    fn test_empty_level_on_directory_is_invariant_error() {
        let matcher = matcher(&[("/d", FileStat::directory(0o777, 0, 0))]);
        let query = AccessQuery::new("/d", AccessClass::OWNER, level(0));
        assert!(matches!(matcher.check(&query), Err(Error::InvalidModeMask(_))));
    }

    #[test]
    fn test_unreachable_is_false_not_error() {
        let matcher = matcher(&[]);
        let missing = Path::new("/locked/file");
        assert!(!matcher.is_readable_to(missing, AccessClass::ALL, true).unwrap());
        let query = AccessQuery::new(missing, AccessClass::SOMEONE, PermissionLevel::ALL);
        assert!(!matcher.check(&query).unwrap());
    }
}
