//! Integration tests for the moviecache binary
//!
//! These never reach the real catalog: network commands either fail before
//! sending or point at a closed local port.

use chrono::{Duration, Utc};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

use moviecache::cache::{CacheStore, CachedPage, FileCacheStore};
use moviecache::data::{MediaType, MovieSummary};

/// Nothing listens here, so connections are refused immediately
const CLOSED_PORT_URL: &str = "http://127.0.0.1:9/";

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    run_cli_with_stdin(args, "")
}

fn run_cli_with_stdin(args: &[&str], stdin: &str) -> std::process::Output {
    use std::io::Write;
    use std::process::Stdio;

    let mut child = Command::new(env!("CARGO_BIN_EXE_moviecache"))
        .args(args)
        .env_remove("OMDB_API_KEY")
        .env_remove("OMDB_BASE_URL")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute moviecache");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("Failed to write stdin");
    child.wait_with_output().expect("Failed to wait for moviecache")
}

fn dir_arg(dir: &TempDir) -> &str {
    dir.path().to_str().expect("temp dir path is UTF-8")
}

async fn seed_stale_page(dir: &Path, query: &str) {
    let store = FileCacheStore::with_dir(dir.to_path_buf());
    let mut page = CachedPage::new(
        query,
        1,
        vec![MovieSummary {
            id: "tt0372784".to_string(),
            title: "Batman Begins".to_string(),
            year: "2005".to_string(),
            poster_url: None,
            media_type: MediaType::Movie,
        }],
    );
    page.fetched_at = Utc::now() - Duration::hours(48);
    store.upsert(&page).await.expect("seed cache entry");
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(
        output.status.success(),
        "Expected --help to exit successfully"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("moviecache"), "Help should mention moviecache");
    assert!(stdout.contains("search"), "Help should mention the search command");
    assert!(stdout.contains("cache"), "Help should mention the cache command");
}

#[test]
fn test_search_without_api_key_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["--cache-dir", dir_arg(&dir), "search", "batman"]);

    assert!(!output.status.success(), "Expected search without a key to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("OMDB_API_KEY"),
        "Should explain how to supply a key: {}",
        stderr
    );
}

#[test]
fn test_zero_pages_is_rejected() {
    let output = run_cli(&["search", "batman", "--pages", "0"]);
    assert!(!output.status.success());
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let output = run_cli(&["--base-url", "ftp://example.com", "cache", "count"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid base URL"), "stderr: {}", stderr);
}

#[test]
fn test_cache_count_on_empty_dir() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&["--cache-dir", dir_arg(&dir), "cache", "count"]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "0 cached pages");
}

#[tokio::test]
async fn test_cache_clear_expired_removes_stale_pages() {
    let dir = TempDir::new().unwrap();
    seed_stale_page(dir.path(), "batman").await;

    let output = run_cli(&["--cache-dir", dir_arg(&dir), "cache", "count"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1 cached pages");

    let output = run_cli(&["--cache-dir", dir_arg(&dir), "cache", "clear", "--expired"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "Removed 1 cached pages"
    );
}

#[test]
fn test_offline_search_without_cache_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(&[
        "--api-key",
        "test-key",
        "--base-url",
        CLOSED_PORT_URL,
        "--timeout",
        "2",
        "--cache-dir",
        dir_arg(&dir),
        "search",
        "batman",
    ]);

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("No internet connection") || stdout.contains("timed out"),
        "Should report the connection problem: {}",
        stdout
    );
}

#[tokio::test]
async fn test_offline_search_serves_stale_cache() {
    let dir = TempDir::new().unwrap();
    seed_stale_page(dir.path(), "batman").await;

    let output = run_cli(&[
        "--api-key",
        "test-key",
        "--base-url",
        CLOSED_PORT_URL,
        "--timeout",
        "2",
        "--cache-dir",
        dir_arg(&dir),
        "search",
        "Batman",
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Batman Begins (2005)"), "stdout: {}", stdout);
    assert!(stdout.contains("offline — showing cached results"), "stdout: {}", stdout);
}

#[test]
fn test_interactive_commands_without_network() {
    let output = run_cli_with_stdin(
        &["--api-key", "test-key", "--no-persist", "interactive"],
        ":count\n:bogus\n:more\n:quit\n",
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0 cached pages"));
    assert!(stdout.contains("Unknown command: :bogus"));
    assert!(stdout.contains("(search for something first)"));
}
