//! End-to-end CLI tests for the specfetch binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

/// Binary with a clean environment: no user config, no color, no `RUST_LOG`.
fn specfetch(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("specfetch").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.join("config"))
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn run_args(server: &MockServer, dir: &TempDir) -> Vec<String> {
    vec![
        "--base-url".to_string(),
        format!("{}/Rel-18/", server.uri()),
        "--listing".to_string(),
        "s1/".to_string(),
        "-o".to_string(),
        dir.path().join("data").display().to_string(),
        "--state-dir".to_string(),
        dir.path().display().to_string(),
        "-c".to_string(),
        "2".to_string(),
    ]
}

async fn serve(server: &MockServer, route: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

#[test]
fn test_binary_help_displays_usage() {
    let dir = TempDir::new().unwrap();
    specfetch(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mirror every specification archive"));
}

#[test]
fn test_binary_version_displays_version() {
    let dir = TempDir::new().unwrap();
    specfetch(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("specfetch"));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let dir = TempDir::new().unwrap();
    specfetch(dir.path())
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_invalid_config_file_exits_with_setup_failure() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "concurrency = 0\n").unwrap();

    specfetch(dir.path())
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("concurrency"));
}

#[test]
fn test_binary_missing_explicit_config_exits_with_setup_failure() {
    let dir = TempDir::new().unwrap();
    specfetch(dir.path())
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .assert()
        .code(2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_clean_run_exits_zero_and_removes_state() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let dir = TempDir::new().unwrap();
    serve(&server, "/Rel-18/s1/", 200, r#"<a href="a.zip">a</a>"#).await;
    serve(&server, "/Rel-18/s1/a.zip", 200, "zip-bytes").await;

    specfetch(dir.path())
        .args(run_args(&server, &dir))
        .assert()
        .code(0)
        .stdout(predicate::str::contains("State file removed"));

    assert_eq!(
        std::fs::read_to_string(dir.path().join("data/s1/a.zip")).unwrap(),
        "zip-bytes"
    );
    assert!(!dir.path().join("download_state_rel-18.json").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_partial_run_exits_one_with_resume_hint() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let dir = TempDir::new().unwrap();
    serve(
        &server,
        "/Rel-18/s1/",
        200,
        r#"<a href="ok.zip">ok</a><a href="gone.zip">gone</a>"#,
    )
    .await;
    serve(&server, "/Rel-18/s1/ok.zip", 200, "ok").await;
    serve(&server, "/Rel-18/s1/gone.zip", 404, "").await;

    specfetch(dir.path())
        .args(run_args(&server, &dir))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("failed 1"))
        .stdout(predicate::str::contains("gone.zip"))
        .stdout(predicate::str::contains("Re-run the same command to resume"));

    assert!(dir.path().join("download_state_rel-18.json").exists());
    assert!(dir.path().join("data/s1/ok.zip").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_list_prints_pending_urls_without_downloading() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let dir = TempDir::new().unwrap();
    serve(
        &server,
        "/Rel-18/s1/",
        200,
        r#"<a href="b.zip">b</a><a href="a.zip">a</a><a href="notes.txt">n</a>"#,
    )
    .await;

    let expected = format!(
        "{uri}/Rel-18/s1/a.zip\n{uri}/Rel-18/s1/b.zip\n",
        uri = server.uri()
    );
    specfetch(dir.path())
        .args(run_args(&server, &dir))
        .arg("--list")
        .assert()
        .code(0)
        .stdout(predicate::str::diff(expected));

    assert!(!dir.path().join("data").exists());
    assert!(!dir.path().join("download_state_rel-18.json").exists());
}
