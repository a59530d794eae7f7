//! End-to-end visibility workflows through the local adapter

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;

use modecheck::{
    ConfigLoader, EngineConfig, LocalAdapter, PermissionEngine, Visibility, VisibilityPermissions,
};

fn adapter_in(dir: &tempfile::TempDir, permissions: VisibilityPermissions) -> LocalAdapter {
    LocalAdapter::new(dir.path().join("storage"), PermissionEngine::local(), permissions).unwrap()
}

fn mode_of(adapter: &LocalAdapter, path: &str) -> u32 {
    let location = adapter.apply_path_prefix(path).unwrap();
    fs::metadata(location).unwrap().permissions().mode() & 0o777
}

#[test]
fn e2e_owned_0644_file_reports_readonly() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = adapter_in(&dir, VisibilityPermissions::default());

    adapter.write("content/entry.yml", b"title: hello").unwrap();
    let location = adapter.apply_path_prefix("content/entry.yml").unwrap();
    fs::set_permissions(&location, fs::Permissions::from_mode(0o644)).unwrap();

    assert!(adapter.engine().is_owned_by_process(&location, false).unwrap());
    assert_eq!(adapter.visibility("content/entry.yml").unwrap(), Visibility::Readonly);
}

#[test]
fn e2e_visibility_lifecycle_for_directories() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = adapter_in(&dir, VisibilityPermissions::default());
    adapter.create_dir("theme").unwrap();

    adapter.set_visibility("theme", Visibility::Public).unwrap();
    assert_eq!(mode_of(&adapter, "theme"), 0o755);
    assert_eq!(adapter.visibility("theme").unwrap(), Visibility::Public);

    adapter.set_visibility("theme", Visibility::Private).unwrap();
    assert_eq!(mode_of(&adapter, "theme"), 0o700);
    assert_eq!(adapter.visibility("theme").unwrap(), Visibility::Private);

    // Directory checks only look at execute bits, and 0o744 gives the group none
    adapter.set_visibility("theme", Visibility::Readonly).unwrap();
    assert_eq!(adapter.visibility("theme").unwrap(), Visibility::Private);

    adapter.set_visibility("theme", Visibility::Public).unwrap();
}

#[test]
fn e2e_configured_permission_table_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config/modecheck.json");

    let mut config = EngineConfig::default();
    config.permissions = VisibilityPermissions {
        public: 0o666,
        readonly: 0o444,
        private: 0o600,
    };
    ConfigLoader::save(&config_path, &config).unwrap();

    let loaded = ConfigLoader::load(&config_path).unwrap();
    let adapter = LocalAdapter::new(
        dir.path().join("storage"),
        PermissionEngine::from_config(&loaded).unwrap(),
        loaded.permissions,
    )
    .unwrap();

    adapter.write("files/report.csv", b"a,b\n").unwrap();

    for visibility in [Visibility::Public, Visibility::Readonly, Visibility::Private] {
        adapter.set_visibility("files/report.csv", visibility).unwrap();
        assert_eq!(
            loaded.permissions.visibility_for(mode_of(&adapter, "files/report.csv")),
            Some(visibility)
        );
        assert_eq!(adapter.visibility("files/report.csv").unwrap(), visibility);
    }
}

#[test]
fn e2e_guarded_mutations() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = adapter_in(&dir, VisibilityPermissions::default());

    adapter.write("locked.txt", b"original").unwrap();
    adapter.set_visibility("locked.txt", Visibility::Readonly).unwrap();

    // 0o744 leaves the group without write, so the owner-or-group check refuses
    assert!(!adapter.update("locked.txt", b"changed").unwrap());
    assert!(!adapter.delete("locked.txt").unwrap());
    assert_eq!(adapter.read("locked.txt").unwrap(), Some(b"original".to_vec()));

    let location = adapter.apply_path_prefix("locked.txt").unwrap();
    fs::set_permissions(&location, fs::Permissions::from_mode(0o664)).unwrap();
    assert!(adapter.update("locked.txt", b"changed").unwrap());
    assert!(adapter.delete("locked.txt").unwrap());
    assert!(!location.exists());
}

#[test]
fn e2e_visibility_serializes_for_adapters() {
    let json = serde_json::to_value([Visibility::Public, Visibility::Readonly, Visibility::Private])
        .unwrap();
    assert_eq!(json, serde_json::json!(["public", "readonly", "private"]));
}
