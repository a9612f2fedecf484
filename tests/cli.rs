//! CLI integration tests for the convert and import commands.
//!
//! Each test runs the binary against its own SQLite store and blob
//! directory, so tests can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_fs::TempDir;
use chartshift::chart::load_dir;
use chartshift::context::CallContext;
use chartshift::store::{ResourceStore, SqliteStore};
use chartshift::types::{BUILTIN_LABEL_KEY, LabelSelector};
use common::{LegacyDump, namespace, write_chart};
use predicates::prelude::*;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        let test = Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        };
        test.write_config("");
        test
    }

    fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    fn db_path(&self) -> PathBuf {
        self.path("resources.db")
    }

    fn config_path(&self) -> PathBuf {
        self.path("chartshift.toml")
    }

    /// Points the store and blobs into the temp dir, then appends `extra`.
    fn write_config(&self, extra: &str) {
        let config = format!(
            "{extra}\n[store]\nkind = \"sqlite\"\npath = {:?}\n\n[blob]\nkind = \"fs\"\nroot = {:?}\n\n[retry]\nattempts = 3\nbackoff_ms = 1\n",
            self.db_path().to_string_lossy(),
            self.path("blobs").to_string_lossy(),
        );
        fs::write(self.config_path(), config).expect("failed to write config");
    }

    fn store(&self) -> SqliteStore {
        let store = SqliteStore::new(self.db_path()).expect("failed to open store");
        store.initialize().expect("failed to initialize store");
        store
    }

    fn legacy_dir(&self) -> PathBuf {
        let dir = self.path("legacy");
        fs::create_dir_all(&dir).unwrap();
        LegacyDump::standard().write(&dir);
        dir
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("chartshift").expect("failed to find binary");
        cmd.env("NO_COLOR", "1")
            .arg("--config")
            .arg(self.config_path());
        cmd
    }
}

fn write_archive(dir: &Path, name: &str, version: &str) {
    let source = dir.join(format!("src-{name}"));
    write_chart(&source, name, version, "1.0");
    let package = load_dir(&source).unwrap().package().unwrap();
    fs::write(dir.join(format!("{name}-{version}.tgz")), package).unwrap();
    fs::remove_dir_all(source).unwrap();
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("chartshift")
        .expect("failed to find binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("convert"))
        .stdout(predicate::str::contains("import"));
}

#[test]
fn test_convert() {
    let test = TestContext::new();
    test.store().put_namespace("", &namespace("demo", "ws-a")).unwrap();
    let legacy = test.legacy_dir();

    test.cmd()
        .arg("convert")
        .arg("--legacy-dir")
        .arg(&legacy)
        .assert()
        .success()
        .stdout(predicate::str::contains("categories:   1 created"))
        .stdout(predicate::str::contains("releases:     1 created, 0 existing, 1 skipped"));

    let ctx = CallContext::background();
    let store = test.store();
    assert!(store.get_application(&ctx, "app-nginx").is_ok());
    assert!(store.get_release(&ctx, "cl-web").is_ok());
    assert!(test.path("blobs").join("appv-nginx1").is_file());
}

#[test]
fn test_convert_twice_is_idempotent() {
    let test = TestContext::new();
    let legacy = test.legacy_dir();

    test.cmd()
        .arg("convert")
        .arg("--legacy-dir")
        .arg(&legacy)
        .assert()
        .success();

    test.cmd()
        .arg("convert")
        .arg("--legacy-dir")
        .arg(&legacy)
        .assert()
        .success()
        .stdout(predicate::str::contains("applications: 0 created, 1 existing"));
}

#[test]
fn test_convert_reads_legacy_dir_from_config() {
    let test = TestContext::new();
    let legacy = test.legacy_dir();
    test.write_config(&format!("legacy_dir = {:?}", legacy.to_string_lossy()));

    test.cmd()
        .arg("convert")
        .assert()
        .success()
        .stdout(predicate::str::contains("versions:     1 created"));
}

#[test]
fn test_convert_missing_dump_fails() {
    let test = TestContext::new();

    test.cmd()
        .arg("convert")
        .arg("--legacy-dir")
        .arg(test.path("nowhere"))
        .assert()
        .failure();
}

#[test]
fn test_invalid_config_fails() {
    let test = TestContext::new();
    fs::write(test.config_path(), "[retry]\nattempts = 0\n").unwrap();

    test.cmd()
        .arg("convert")
        .arg("--legacy-dir")
        .arg(test.path("nowhere"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("retry.attempts"));
}

#[test]
fn test_import_chart_directory() {
    let test = TestContext::new();
    let charts = test.path("charts");
    fs::create_dir_all(&charts).unwrap();
    write_archive(&charts, "nginx", "1.0.0");
    write_archive(&charts, "redis", "6.0.0");

    test.cmd()
        .arg("import")
        .arg("--chart-path")
        .arg(&charts)
        .assert()
        .success()
        .stdout(predicate::str::contains("applications: 2 created"));

    let builtin = LabelSelector::new().with(BUILTIN_LABEL_KEY, "true");
    let apps = test
        .store()
        .list_applications(&CallContext::background(), &builtin)
        .unwrap();
    assert_eq!(apps.len(), 2);

    test.cmd()
        .arg("import")
        .arg("--chart-path")
        .arg(&charts)
        .assert()
        .success()
        .stdout(predicate::str::contains("versions:     0 created, 2 existing"));
}

#[test]
fn test_kube_flags_need_kube_store() {
    let test = TestContext::new();

    test.cmd()
        .arg("--master")
        .arg("https://127.0.0.1:6443")
        .arg("convert")
        .assert()
        .failure()
        .stderr(predicate::str::contains("kube store"));
}
