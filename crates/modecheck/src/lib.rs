//! Unix permission verification for the current process
//!
//! Answers whether the process identity can read, write or fully access a
//! filesystem object according to its owner/group/other permission bits, and
//! summarizes that as a public/readonly/private visibility. The checks are
//! advisory: nothing here prevents an operation.

pub mod adapter;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod inspector;
pub mod logging;
pub mod matcher;
pub mod mode;
pub mod stat;
pub mod visibility;

pub use adapter::LocalAdapter;
pub use classifier::AccessClassifier;
pub use config::{ConfigLoader, EngineConfig, LoggingConfig, VisibilityPermissions};
pub use engine::PermissionEngine;
pub use error::{Error, Result};
pub use identity::{
    IdentityProvider, IdentityProviderKind, IdentityResolver, ProcessIdentity, StaticIdentity,
};
pub use inspector::ModeInspector;
pub use logging::init_logging;
pub use matcher::{build_mode_mask, test_mode_mask, AccessQuery, PermissionMatcher};
pub use mode::{AccessClass, FileType, PermissionLevel, RawMode};
pub use stat::{FileStat, InMemoryStatSource, LocalStatSource, StatSource};
pub use visibility::{ProcessAccess, Visibility, VisibilityResolver};
