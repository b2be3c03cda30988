//! Integration tests for the batch entry point (`run_scan`).
//!
//! These run the full production wiring (file feed, scheduler, audit
//! database) without any network access: no provider API keys are present,
//! so both providers degrade to `Unknown` and every analyzed URL ends up
//! indeterminate. The SSRF guard is disabled to avoid DNS lookups.

use std::io::Write;

use tempfile::TempDir;

use link_verdict::{run_scan, Config};

fn write_urls(dir: &TempDir, lines: &str) -> std::path::PathBuf {
    let path = dir.path().join("urls.txt");
    let mut file = std::fs::File::create(&path).expect("create urls file");
    file.write_all(lines.as_bytes()).expect("write urls file");
    path
}

#[tokio::test]
async fn test_run_scan_counts_verdicts_and_rejections() {
    let dir = TempDir::new().unwrap();
    let file = write_urls(
        &dir,
        "# comment line\n\
         https://example.com/a\n\
         \n\
         javascript:alert(1)\n\
         ftp://example.com/file\n",
    );

    let config = Config {
        file,
        db_path: dir.path().join("audit.db"),
        key_file: dir.path().join("audit.key"),
        no_ssrf_block: true,
        recheck_delay_secs: 0,
        ..Default::default()
    };

    let report = run_scan(config).await.expect("run_scan");
    assert_eq!(report.total_urls, 3);
    assert_eq!(report.indeterminate, 1); // no API keys => both providers unknown
    assert_eq!(report.rejected, 2);
    assert_eq!(report.safe, 0);
    assert_eq!(report.dangerous, 0);
}

#[tokio::test]
async fn test_run_scan_allow_list_short_circuits_to_safe() {
    let dir = TempDir::new().unwrap();
    let file = write_urls(&dir, "https://docs.example.org/page\n");

    let config = Config {
        file,
        db_path: dir.path().join("audit.db"),
        key_file: dir.path().join("audit.key"),
        no_ssrf_block: true,
        recheck_delay_secs: 0,
        allow_domains: vec!["example.org".to_string()],
        ..Default::default()
    };

    let report = run_scan(config).await.expect("run_scan");
    assert_eq!(report.total_urls, 1);
    assert_eq!(report.safe, 1);
}

#[tokio::test]
async fn test_run_scan_creates_audit_artifacts() {
    let dir = TempDir::new().unwrap();
    let file = write_urls(&dir, "https://example.com/a\n");
    let db_path = dir.path().join("audit.db");
    let key_file = dir.path().join("audit.key");

    let config = Config {
        file,
        db_path: db_path.clone(),
        key_file: key_file.clone(),
        no_ssrf_block: true,
        recheck_delay_secs: 0,
        ..Default::default()
    };

    let report = run_scan(config).await.expect("run_scan");
    assert_eq!(report.db_path, db_path);
    assert!(db_path.exists(), "audit database should be created");
    assert!(key_file.exists(), "audit key file should be created");
}

#[tokio::test]
async fn test_run_scan_missing_input_file_errors() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        file: dir.path().join("does_not_exist.txt"),
        db_path: dir.path().join("audit.db"),
        key_file: dir.path().join("audit.key"),
        ..Default::default()
    };

    assert!(run_scan(config).await.is_err());
}
