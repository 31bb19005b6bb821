//! The `--worker` entry point run as a real process

#![cfg(unix)]

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

async fn run_worker(stdin: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_deployd"))
        .arg("--worker")
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut input = child.stdin.take().unwrap();
    input.write_all(stdin).await.unwrap();
    drop(input);

    tokio::time::timeout(Duration::from_secs(30), child.wait_with_output())
        .await
        .expect("worker did not exit")
        .unwrap()
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args([
            "-c",
            "user.name=deployd",
            "-c",
            "user.email=deployd@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

#[tokio::test]
async fn test_bad_request_is_nacked() {
    let output = run_worker(b"[]\n").await;

    assert_eq!(String::from_utf8_lossy(&output.stdout), "{\"ack\":false}\n");
    assert!(!output.status.success());
}

#[tokio::test]
async fn test_closed_stdin_is_nacked() {
    let output = run_worker(b"").await;

    assert_eq!(String::from_utf8_lossy(&output.stdout), "{\"ack\":false}\n");
    assert!(!output.status.success());
}

#[tokio::test]
async fn test_valid_request_acks_and_runs() {
    let repo = tempfile::tempdir().unwrap();
    git(repo.path(), &["init", "--quiet"]);
    git(repo.path(), &["commit", "--quiet", "--allow-empty", "-m", "initial"]);
    let head = git(repo.path(), &["rev-parse", "HEAD"]);

    // Nothing listens on port 1: the fetch and the status report both fail
    let request = serde_json::json!({
        "dir": repo.path(),
        "commit": head,
        "steps": [["touch", "deployed"]],
        "owner": "acme",
        "repo": "shop",
        "deployment_id": 42,
        "token": "ghs_test_token",
        "endpoints": {
            "api_url": "http://127.0.0.1:1",
            "git_url": "http://127.0.0.1:1",
        },
    });
    let mut line = serde_json::to_vec(&request).unwrap();
    line.push(b'\n');

    let output = run_worker(&line).await;

    // The handshake is the only thing on stdout
    assert_eq!(String::from_utf8_lossy(&output.stdout), "{\"ack\":true}\n");
    assert!(output.status.success());
    assert!(!repo.path().join("deployed").exists());
}
