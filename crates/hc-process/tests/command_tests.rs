// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end tests for the command adapter against real POSIX utilities.
#![cfg(unix)]

use hc_error::ErrorCode;
use hc_process::{Command, CommandOptions, ExitStatus, ProcessError, StdioMode};
use std::time::Duration;
use tokio::io::AsyncReadExt;

fn sh(script: &str) -> CommandOptions {
    CommandOptions::default().args(["-c", script])
}

// ── output() ────────────────────────────────────────────────────────

#[tokio::test]
async fn echo_hello_piped() {
    let out = Command::new(
        "echo",
        CommandOptions::default()
            .arg("hello")
            .stdout(StdioMode::Piped),
    )
    .output()
    .await
    .unwrap();

    assert!(out.success);
    assert_eq!(out.code, 0);
    assert_eq!(out.signal, None);
    assert_eq!(out.stdout, b"hello\n");
    assert!(out.stderr.is_empty());
}

#[tokio::test]
async fn stdout_is_exact_concatenation_in_write_order() {
    let script = "printf 'a'; printf 'bc'; printf '\\n'; printf 'def'";
    let out = Command::new("sh", sh(script).stdout(StdioMode::Piped))
        .output()
        .await
        .unwrap();
    assert_eq!(out.stdout, b"abc\ndef");
}

#[tokio::test]
async fn large_stdout_is_fully_collected() {
    // Well past a single pipe buffer and a single read chunk.
    let out = Command::new(
        "sh",
        sh("i=0; while [ $i -lt 20000 ]; do echo 0123456789; i=$((i+1)); done")
            .stdout(StdioMode::Piped),
    )
    .output()
    .await
    .unwrap();
    assert!(out.success);
    assert_eq!(out.stdout.len(), 20000 * 11);
    assert!(out.stdout.chunks(11).all(|line| line == b"0123456789\n"));
}

#[tokio::test]
async fn unpiped_stdout_yields_empty_bytes() {
    let out = Command::new("true", CommandOptions::default().stdout(StdioMode::Null))
        .output()
        .await
        .unwrap();
    assert!(out.success);
    assert!(out.stdout.is_empty());
}

#[tokio::test]
async fn piped_stderr_is_not_captured_by_output() {
    let out = Command::new(
        "sh",
        sh("echo out; echo err >&2")
            .stdout(StdioMode::Piped)
            .stderr(StdioMode::Piped),
    )
    .output()
    .await
    .unwrap();
    assert_eq!(out.stdout, b"out\n");
    assert!(out.stderr.is_empty());
}

#[tokio::test]
async fn nonzero_exit_is_reported() {
    let out = Command::new("sh", sh("exit 7")).output().await.unwrap();
    assert!(!out.success);
    assert_eq!(out.code, 7);
    assert_eq!(out.signal, None);
}

#[tokio::test]
async fn signal_termination_reports_name_and_zero_code() {
    let out = Command::new("sh", sh("kill -KILL $$")).output().await.unwrap();
    assert_eq!(
        out.status(),
        ExitStatus {
            success: false,
            code: 0,
            signal: Some("SIGKILL".into()),
        }
    );
}

// ── spawn() failures ────────────────────────────────────────────────

#[tokio::test]
async fn missing_executable_fails_synchronously() {
    let cmd = Command::new(
        "hc-process-definitely-not-a-real-binary",
        CommandOptions::default(),
    );
    let err = cmd.spawn().unwrap_err();
    match &err {
        ProcessError::Spawn { program, source } => {
            assert_eq!(program, "hc-process-definitely-not-a-real-binary");
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected Spawn, got {other:?}"),
    }
    assert_eq!(err.code(), ErrorCode::LaunchNotFound);
}

#[tokio::test]
async fn non_executable_file_is_permission_denied() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.txt");
    std::fs::write(&path, "not a program").unwrap();
    let err = Command::new(path.to_string_lossy(), CommandOptions::default())
        .spawn()
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::LaunchPermissionDenied);
}

// ── env / cwd ───────────────────────────────────────────────────────

#[tokio::test]
async fn env_overrides_merge_over_inherited_environment() {
    let out = Command::new(
        "sh",
        sh("printf '%s|%s' \"$HC_TEST_VAR\" \"${PATH:+has-path}\"")
            .env("HC_TEST_VAR", "override")
            .stdout(StdioMode::Piped),
    )
    .output()
    .await
    .unwrap();
    assert_eq!(out.stdout_text(), "override|has-path");
}

#[tokio::test]
async fn cwd_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    let canonical = dir.path().canonicalize().unwrap();
    let out = Command::new(
        "pwd",
        CommandOptions::default()
            .cwd(&canonical)
            .stdout(StdioMode::Piped),
    )
    .output()
    .await
    .unwrap();
    assert_eq!(out.stdout_text().trim_end(), canonical.to_string_lossy());
}

// ── stdin ───────────────────────────────────────────────────────────

#[tokio::test]
async fn stdin_absent_unless_piped() {
    let mut child = Command::new("true", CommandOptions::default())
        .spawn()
        .unwrap();
    assert!(child.stdin().is_none());
    assert!(child.status().await.unwrap().success);
}

#[tokio::test]
async fn stdin_writes_reach_child_in_order() {
    let mut child = Command::new(
        "cat",
        CommandOptions::default()
            .stdin(StdioMode::Piped)
            .stdout(StdioMode::Piped),
    )
    .spawn()
    .unwrap();

    // `write` takes `&mut self`, so a write cannot start before the previous
    // one resolved; the child's echo shows the bytes arrived in that order.
    let stdin = child.stdin().expect("stdin is piped");
    let mut writer = stdin.writer();
    for i in 0..16 {
        let chunk = format!("{i};");
        let n = writer.write(chunk.as_bytes()).await.unwrap();
        assert_eq!(n, chunk.len());
    }
    writer.close().await.unwrap();
    writer.release_lock();

    let expected: String = (0..16).map(|i| format!("{i};")).collect();
    let out = child.output().await.unwrap();
    assert_eq!(out.stdout_text(), expected);
    assert!(out.success);
}

#[tokio::test]
async fn write_after_close_rejects_only_that_write() {
    let mut child = Command::new(
        "cat",
        CommandOptions::default()
            .stdin(StdioMode::Piped)
            .stdout(StdioMode::Null),
    )
    .spawn()
    .unwrap();

    let stdin = child.stdin().unwrap();
    let mut writer = stdin.writer();
    writer.write(b"x").await.unwrap();
    writer.close().await.unwrap();

    let err = writer.write(b"late").await.unwrap_err();
    assert!(matches!(err, ProcessError::StdinClosed));
    assert_eq!(err.code(), ErrorCode::IoWriteAfterClose);
    assert!(matches!(
        writer.close().await.unwrap_err(),
        ProcessError::StdinClosed
    ));
    writer.release_lock();

    // The process and its status are unaffected.
    assert!(child.stdin().unwrap().is_closed());
    assert!(child.status().await.unwrap().success);
}

#[tokio::test]
async fn write_to_exited_child_rejects_with_broken_pipe() {
    let mut child = Command::new(
        "true",
        CommandOptions::default().stdin(StdioMode::Piped),
    )
    .spawn()
    .unwrap();
    child.status().await.unwrap();

    let stdin = child.stdin().unwrap();
    let mut writer = stdin.writer();
    // The first write may still land in the pipe buffer on some kernels, so
    // keep writing until the host reports the closed reader.
    let payload = vec![b'z'; 64 * 1024];
    let mut failure = None;
    for _ in 0..64 {
        if let Err(e) = writer.write(&payload).await {
            failure = Some(e);
            break;
        }
    }
    let err = failure.expect("writing to a dead child must eventually fail");
    assert_eq!(err.code(), ErrorCode::IoBrokenPipe);
}

// ── status ──────────────────────────────────────────────────────────

#[tokio::test]
async fn status_resolves_on_exit_not_on_stream_close() {
    // The child closes stdout immediately but keeps running for a while.
    let child = Command::new(
        "sh",
        sh("exec 1>&-; sleep 0.3; exit 4").stdout(StdioMode::Piped),
    )
    .spawn()
    .unwrap();

    let early = tokio::time::timeout(Duration::from_millis(100), child.status()).await;
    assert!(early.is_err(), "status resolved before the process exited");

    let status = child.status().await.unwrap();
    assert_eq!(status.code, 4);
}

#[tokio::test]
async fn status_can_be_awaited_repeatedly() {
    let child = Command::new("sh", sh("exit 3")).spawn().unwrap();
    let first = child.status().await.unwrap();
    let second = child.status().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.code, 3);
}

#[tokio::test]
async fn stdout_and_status_are_independent() {
    // Stdout closes long after the shell reports exit via a background writer.
    let mut child = Command::new(
        "sh",
        sh("(sleep 0.2; echo late) & exit 0").stdout(StdioMode::Piped),
    )
    .spawn()
    .unwrap();
    let status = child.status().await.unwrap();
    assert!(status.success);
    let bytes = child.read_stdout().await.unwrap();
    assert_eq!(bytes, b"late\n");
}

#[tokio::test]
async fn raw_stdout_handle_can_be_taken() {
    let mut child = Command::new(
        "echo",
        CommandOptions::default()
            .arg("raw")
            .stdout(StdioMode::Piped),
    )
    .spawn()
    .unwrap();
    let mut stdout = child.take_stdout().unwrap();
    let mut buf = String::new();
    stdout.read_to_string(&mut buf).await.unwrap();
    assert_eq!(buf, "raw\n");
    // Nothing left for the accumulator.
    assert!(child.read_stdout().await.unwrap().is_empty());
    assert!(child.pid().is_some());
}

#[tokio::test]
async fn raw_stderr_handle_can_be_read_directly() {
    let mut child = Command::new(
        "sh",
        sh("echo oops >&2").stderr(StdioMode::Piped),
    )
    .spawn()
    .unwrap();
    let mut stderr = child.take_stderr().unwrap();
    let mut buf = String::new();
    stderr.read_to_string(&mut buf).await.unwrap();
    assert_eq!(buf, "oops\n");
    assert!(child.status().await.unwrap().success);
}
