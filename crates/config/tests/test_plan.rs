//! Test plan for the `parley-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and validation behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use parley_config::{load, AppConfig, AttachmentConfig, DatabaseConfig};

const ENV_VARS_TO_RESET: &[&str] = &[
    "PARLEY_CONFIG",
    "PARLEY__DATABASE__URL",
    "PARLEY__DATABASE__MAX_CONNECTIONS",
    "PARLEY__ATTACHMENTS__STORAGE_DIR",
    "PARLEY__ATTACHMENTS__PUBLIC_BASE_URL",
    "PARLEY__ATTACHMENTS__MAX_SIZE_BYTES",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

fn isolated() -> (TempDir, TestContext) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());
    (temp_dir, ctx)
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let (_temp_dir, _ctx) = isolated();

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.database.max_connections,
        defaults.database.max_connections
    );
    assert_eq!(config.attachments.storage_dir, defaults.attachments.storage_dir);
    assert_eq!(
        config.attachments.public_base_url,
        defaults.attachments.public_base_url
    );
    assert_eq!(
        config.attachments.max_size_bytes,
        defaults.attachments.max_size_bytes
    );
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "parley.toml",
        r#"
        [database]
        max_connections = 4
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/parley.toml",
        r#"
        [database]
        max_connections = 7
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.database.max_connections, 4);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "parley.toml",
        r#"
        [attachments]
        storage_dir = "/var/lib/parley/blobs"
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.attachments.storage_dir, "/var/lib/parley/blobs");
    assert_eq!(
        config.attachments.public_base_url,
        defaults.attachments.public_base_url
    );
    assert_eq!(config.database.url, defaults.database.url);
}

#[test]
#[serial]
fn load_reads_explicit_config_path() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [database]
        url = "sqlite://custom.db"
        "#,
    );
    ctx.set_var(
        "PARLEY_CONFIG",
        temp_dir.path().join("elsewhere/custom.toml").display().to_string(),
    );

    let config = load().expect("configuration load should honour PARLEY_CONFIG");
    assert_eq!(config.database.url, "sqlite://custom.db");
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "parley.toml",
        r#"
        [database]
        max_connections = 3
        "#,
    );

    ctx.set_var("PARLEY__DATABASE__MAX_CONNECTIONS", "12");
    ctx.set_var("PARLEY__ATTACHMENTS__PUBLIC_BASE_URL", "https://cdn.example.com");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.database.max_connections, 12);
    assert_eq!(config.attachments.public_base_url, "https://cdn.example.com");
}

#[test]
#[serial]
fn load_rejects_zero_connection_pool() {
    let (_temp_dir, mut ctx) = isolated();

    ctx.set_var("PARLEY__DATABASE__MAX_CONNECTIONS", "0");

    let error = load().expect_err("a zero sized pool should be rejected");
    assert!(error.to_string().contains("max_connections"));
}

#[test]
#[serial]
fn load_rejects_zero_attachment_limit() {
    let (_temp_dir, mut ctx) = isolated();

    ctx.set_var("PARLEY__ATTACHMENTS__MAX_SIZE_BYTES", "0");

    let error = load().expect_err("a zero attachment limit should be rejected");
    assert!(error.to_string().contains("max_size_bytes"));
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "parley.toml",
        r#"
        [database]
        url = "not-terminated
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn database_config_defaults_point_at_local_sqlite() {
    let defaults = DatabaseConfig::default();
    assert_eq!(defaults.url, "sqlite://parley.db");
    assert_eq!(defaults.max_connections, 10);
}

#[test]
fn attachment_config_defaults_cap_uploads_at_ten_megabytes() {
    let defaults = AttachmentConfig::default();
    assert_eq!(defaults.max_size_bytes, 10 * 1024 * 1024);
}
