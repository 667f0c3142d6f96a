//! Command-line tests for runs that leave the filesystem untouched.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use pdfscan_core::testing::scan_pdf;

fn setup(pages: usize) -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().unwrap();
    let doc_path = dir.path().join("scan.pdf");
    fs::write(&doc_path, scan_pdf(pages, 8, 8)).unwrap();
    let config = dir.path().join("pdfscan.json");
    fs::write(&config, "{}").unwrap();
    (dir, doc_path, config)
}

fn cmd(bin: &str, config: &Path) -> Command {
    let mut cmd = Command::cargo_bin(bin).unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

#[test]
fn test_dump_dry_run() {
    let (dir, doc_path, config) = setup(2);

    cmd("pdfscan-dump", &config)
        .arg(&doc_path)
        .arg("--dry")
        .assert()
        .success()
        .stdout(predicate::str::contains("Got image"))
        .stdout(predicate::str::contains("scan p002.jpg"))
        .stdout(predicate::str::contains("2 images extracted"));

    assert!(!dir.path().join("scan p001.jpg").exists());
}

#[test]
fn test_dump_help_mentions_dry_run_counts() {
    Command::cargo_bin("pdfscan-dump")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("still counted as extracted"));
}

#[test]
fn test_dump_missing_document() {
    let (dir, _, config) = setup(1);

    cmd("pdfscan-dump", &config)
        .arg(dir.path().join("absent.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open"));
}

#[test]
fn test_dump_rejects_bad_config() {
    let (_dir, doc_path, config) = setup(1);
    fs::write(&config, r#"{"inject": {"jpeg_quality": 0}}"#).unwrap();

    cmd("pdfscan-dump", &config)
        .arg(&doc_path)
        .arg("--dry")
        .assert()
        .failure()
        .stderr(predicate::str::contains("jpeg_quality"));
}

#[test]
fn test_inject_without_images() {
    let (_dir, doc_path, config) = setup(1);

    cmd("pdfscan-inject", &config)
        .arg(&doc_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("No images to inject! Exiting"));
}

#[test]
fn test_inject_dry_run() {
    let (dir, doc_path, config) = setup(3);
    let original = fs::read(&doc_path).unwrap();
    let replacement = dir.path().join("scan p003.png");
    image::RgbImage::new(12, 12).save(&replacement).unwrap();

    cmd("pdfscan-inject", &config)
        .arg(&doc_path)
        .arg("--dry")
        .assert()
        .success()
        .stdout(predicate::str::contains("Replacing image on page 3"))
        .stdout(predicate::str::contains("scan.bak.pdf"));

    assert!(replacement.exists());
    assert_eq!(fs::read(&doc_path).unwrap(), original);
}
