// Copyright (C) 2025 LES e.V.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for the conversion invoker against stub executables.
//!
//! A small shell script stands in for pandoc so the tests can control
//! exit codes, stderr output, and runtime. Argument positions mirror the
//! real invocation: `$1` input, `$5` output, `${11}` the `team=` variable.

use reportconv_server::convert::{self, CancelToken, ConversionJob, ConvertError};
use reportconv_server::scratch::ScratchFile;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn stub_pandoc(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("pandoc-stub");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn test_job(dir: &Path, executable: &Path, timeout: Duration) -> ConversionJob {
    let input_path = dir.join("input.md");
    std::fs::write(&input_path, "# Hello").unwrap();

    ConversionJob {
        input_path,
        output_path: dir.join("output.pdf"),
        team_name: "Technik".to_string(),
        timeout,
        pandoc_executable: executable.to_string_lossy().into_owned(),
        template_path: dir.join("typst.template"),
        fonts_path: dir.join("fonts"),
    }
}

// ============================================================================
// Success Path
// ============================================================================

#[tokio::test]
async fn test_run_success_writes_output() {
    let dir = TempDir::new().unwrap();
    let stub = stub_pandoc(dir.path(), r#"printf '%%PDF-1.7 stub' > "$5""#);
    let job = test_job(dir.path(), &stub, Duration::from_secs(5));

    convert::run(&job, None).await.unwrap();

    let output = std::fs::read_to_string(&job.output_path).unwrap();
    assert!(output.starts_with("%PDF"));
}

#[tokio::test]
async fn test_run_passes_expected_arguments_and_fonts_env() {
    let dir = TempDir::new().unwrap();
    let stub = stub_pandoc(
        dir.path(),
        r#"printf '%s\n' "$@" > "$5"
printf 'FONTS=%s\n' "$TYPST_FONT_PATHS" >> "$5""#,
    );
    let job = test_job(dir.path(), &stub, Duration::from_secs(5));

    convert::run(&job, None).await.unwrap();

    let recorded = std::fs::read_to_string(&job.output_path).unwrap();
    let lines: Vec<&str> = recorded.lines().collect();

    assert_eq!(lines[0], job.input_path.to_string_lossy());
    assert_eq!(lines[1], "-f");
    assert_eq!(lines[2], "markdown");
    assert_eq!(lines[3], "-o");
    assert_eq!(lines[4], job.output_path.to_string_lossy());
    assert_eq!(lines[5], "-t");
    assert_eq!(lines[6], "pdf");
    assert_eq!(lines[7], "--template");
    assert_eq!(lines[8], job.template_path.to_string_lossy());
    assert_eq!(lines[9], "-V");
    assert_eq!(lines[10], "team=Technik");
    assert_eq!(lines[11], "--pdf-engine");
    assert_eq!(lines[12], "typst");
    assert_eq!(lines[13], "--pdf-engine-opt");
    assert_eq!(lines[14], "--pdf-standard=a-2b");
    assert!(recorded.contains(&format!("FONTS={}", job.fonts_path.to_string_lossy())));
}

// ============================================================================
// Failure Paths
// ============================================================================

#[tokio::test]
async fn test_run_failure_captures_exit_code_and_stderr() {
    let dir = TempDir::new().unwrap();
    let stub = stub_pandoc(
        dir.path(),
        "echo 'typst compile failed' >&2\nexit 7",
    );
    let job = test_job(dir.path(), &stub, Duration::from_secs(5));

    let err = convert::run(&job, None).await.unwrap_err();

    match err {
        ConvertError::Failed { exit_code, stderr } => {
            assert_eq!(exit_code, 7);
            assert!(stderr.contains("typst compile failed"));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_run_missing_executable() {
    let dir = TempDir::new().unwrap();
    let job = test_job(
        dir.path(),
        Path::new("/nonexistent/pandoc-does-not-exist"),
        Duration::from_secs(5),
    );

    let err = convert::run(&job, None).await.unwrap_err();
    assert!(matches!(err, ConvertError::ExecutableNotFound(_)));
}

// ============================================================================
// Timeout and Cancellation
// ============================================================================

#[tokio::test]
async fn test_run_timeout_kills_process() {
    let dir = TempDir::new().unwrap();
    let stub = stub_pandoc(dir.path(), r#"sleep 30"#);
    let job = test_job(dir.path(), &stub, Duration::from_millis(200));

    let start = Instant::now();
    let err = convert::run(&job, None).await.unwrap_err();

    assert!(matches!(err, ConvertError::Timeout));
    assert!(
        start.elapsed() < Duration::from_secs(5),
        "timeout must not wait for the process to finish on its own"
    );
}

#[tokio::test]
async fn test_run_timeout_leaves_no_survivor() {
    let dir = TempDir::new().unwrap();
    // The marker only appears if the stub outlives the kill.
    let stub = stub_pandoc(dir.path(), "sleep 1\ntouch \"$5.marker\"");
    let job = test_job(dir.path(), &stub, Duration::from_millis(200));

    let err = convert::run(&job, None).await.unwrap_err();
    assert!(matches!(err, ConvertError::Timeout));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let marker = PathBuf::from(format!("{}.marker", job.output_path.to_string_lossy()));
    assert!(!marker.exists(), "stub process survived the kill");
}

#[tokio::test]
async fn test_run_cancelled_by_token() {
    let dir = TempDir::new().unwrap();
    let stub = stub_pandoc(dir.path(), r#"sleep 30"#);
    let job = test_job(dir.path(), &stub, Duration::from_secs(30));

    let cancel: CancelToken = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        flag.store(true, Ordering::Relaxed);
    });

    let start = Instant::now();
    let err = convert::run(&job, Some(cancel)).await.unwrap_err();

    assert!(matches!(err, ConvertError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_dropped_request_kills_process_and_cleans_scratch() {
    let dir = TempDir::new().unwrap();
    // The marker only appears if the stub outlives the dropped request.
    let stub = stub_pandoc(dir.path(), "sleep 1\ntouch \"$5.marker\"");

    let input = ScratchFile::create_in("pandoc-input-", dir.path()).unwrap();
    let output = ScratchFile::create_in("pandoc-output-", dir.path()).unwrap();
    std::fs::write(input.path(), "# Hello").unwrap();
    let input_path = input.path().to_path_buf();
    let output_path = output.path().to_path_buf();

    let job = ConversionJob {
        input_path: input_path.clone(),
        output_path: output_path.clone(),
        team_name: "Technik".to_string(),
        timeout: Duration::from_secs(30),
        pandoc_executable: stub.to_string_lossy().into_owned(),
        template_path: dir.path().join("typst.template"),
        fonts_path: dir.path().join("fonts"),
    };

    // A client disconnect drops the request future mid-wait; the scratch
    // files owned by that request are dropped with it.
    let result =
        tokio::time::timeout(Duration::from_millis(300), convert::run(&job, None)).await;
    assert!(result.is_err(), "conversion should still be in-flight");
    drop(input);
    drop(output);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let marker = PathBuf::from(format!("{}.marker", output_path.to_string_lossy()));
    assert!(!marker.exists(), "stub process survived the dropped request");
    assert!(!input_path.exists(), "input scratch file left behind");
    assert!(!output_path.exists(), "output scratch file left behind");
}
