// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::gateway::ProcessGateway;

fn cwd() -> std::path::PathBuf {
    std::env::temp_dir()
}

#[tokio::test]
async fn capture_returns_stdout() {
    let gateway = SystemGateway::new();
    let out = gateway
        .run_capture(Duration::from_secs(5), &cwd(), "echo", &["hello"])
        .await
        .unwrap();
    assert_eq!(out.trim(), "hello");
}

#[tokio::test]
async fn nonzero_exit_carries_stderr() {
    let gateway = SystemGateway::new();
    let err = gateway
        .run(
            Duration::from_secs(5),
            &cwd(),
            "sh",
            &["-c", "echo boom >&2; exit 3"],
        )
        .await
        .unwrap_err();

    match err {
        GatewayError::NonZero { code, stderr, .. } => {
            assert_eq!(code, 3);
            assert_eq!(stderr, "boom");
        }
        other => panic!("expected NonZero, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_binary_is_a_spawn_error() {
    let gateway = SystemGateway::new();
    let err = gateway
        .run(Duration::from_secs(5), &cwd(), "/nonexistent/binary", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Spawn { .. }), "got: {err:?}");
}

#[tokio::test]
async fn timeout_kills_and_reports() {
    let gateway = SystemGateway::new();
    let start = std::time::Instant::now();
    let err = gateway
        .run(Duration::from_millis(200), &cwd(), "sleep", &["10"])
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "got: {err:?}");
    assert!(err.to_string().contains("timed out"), "got: {err}");
    // SIGTERM + grace + SIGKILL, not the full 10s sleep
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn rendered_command_joins_args() {
    assert_eq!(
        super::super::render_command("git", &["status", "-sb"]),
        "git status -sb"
    );
}
