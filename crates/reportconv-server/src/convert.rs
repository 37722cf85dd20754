// Copyright (C) 2025 LES e.V.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Pandoc invocation with bounded execution time.
//!
//! Builds and runs a single `pandoc` subprocess per conversion. The wait
//! loop enforces both the configured timeout and the server-wide cancel
//! flag; whichever fires first kills the process. `kill_on_drop` covers
//! the remaining path where the request future itself is dropped because
//! the client disconnected.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, warn};

use crate::config::Config;

/// Shared flag requesting that in-flight conversions stop.
pub type CancelToken = Arc<AtomicBool>;

/// How often the wait loop re-checks the child, the deadline, and the
/// cancel flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors from a conversion attempt.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConvertError {
    /// The pandoc executable was not found.
    #[error("pandoc executable not found: {0}")]
    ExecutableNotFound(String),

    /// The conversion exceeded its timeout and was killed.
    #[error("conversion timed out")]
    Timeout,

    /// The conversion was cancelled (server shutdown) and was killed.
    #[error("conversion cancelled")]
    Cancelled,

    /// Pandoc exited with a non-zero code.
    #[error("pandoc exit code {exit_code}: {stderr}")]
    Failed {
        /// Exit code from pandoc.
        exit_code: i32,
        /// Captured standard error output. Logged, never sent to clients.
        stderr: String,
    },

    /// I/O failure spawning or supervising the process.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// A single Markdown-to-PDF conversion, consumed exactly once by [`run`].
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Scratch file holding the Markdown source.
    pub input_path: PathBuf,
    /// Scratch file pandoc writes the PDF to.
    pub output_path: PathBuf,
    /// Team display name, passed to the template as `team`.
    pub team_name: String,
    /// Upper bound on conversion time.
    pub timeout: Duration,
    /// Name (or path) of the pandoc executable.
    pub pandoc_executable: String,
    /// Pandoc template for the PDF layout.
    pub template_path: PathBuf,
    /// Font directory for the typst engine (`TYPST_FONT_PATHS`).
    pub fonts_path: PathBuf,
}

impl ConversionJob {
    /// Assemble a job from the process configuration and per-request paths.
    pub fn new(config: &Config, input: &Path, output: &Path, team_name: String) -> Self {
        Self {
            input_path: input.to_path_buf(),
            output_path: output.to_path_buf(),
            team_name,
            timeout: config.pandoc_timeout,
            pandoc_executable: config.pandoc_executable.clone(),
            template_path: config.typst_template_path.clone(),
            fonts_path: config.fonts_path.clone(),
        }
    }
}

/// Run a conversion to completion, timeout, or cancellation.
///
/// Pandoc reads Markdown from the job's input file and writes a PDF/A-2b
/// to its output file. Fonts are pinned via `TYPST_FONT_PATHS` so the
/// produced PDFs are reproducible across hosts. No retries: a failed
/// conversion is reported once.
pub async fn run(job: &ConversionJob, cancel: Option<CancelToken>) -> Result<()> {
    let mut cmd = Command::new(&job.pandoc_executable);
    cmd.arg(&job.input_path)
        .args(["-f", "markdown", "-o"])
        .arg(&job.output_path)
        .args(["-t", "pdf", "--template"])
        .arg(&job.template_path)
        .arg("-V")
        .arg(format!("team={}", job.team_name))
        .args(["--pdf-engine", "typst"])
        .args(["--pdf-engine-opt", "--pdf-standard=a-2b"])
        .env("TYPST_FONT_PATHS", &job.fonts_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(
        executable = %job.pandoc_executable,
        input = %job.input_path.display(),
        output = %job.output_path.display(),
        team = %job.team_name,
        "executing pandoc"
    );

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConvertError::ExecutableNotFound(
                job.pandoc_executable.clone(),
            ));
        }
        Err(e) => return Err(ConvertError::Io(e)),
    };
    let stderr_handle = child.stderr.take();

    wait_with_cancellation(&mut child, cancel, job.timeout, stderr_handle).await
}

/// Wait for the child with timeout and cancellation support.
async fn wait_with_cancellation(
    child: &mut tokio::process::Child,
    cancel: Option<CancelToken>,
    timeout: Duration,
    stderr_handle: Option<tokio::process::ChildStderr>,
) -> Result<()> {
    use tokio::io::AsyncReadExt;

    let start = std::time::Instant::now();

    loop {
        if let Some(ref flag) = cancel
            && flag.load(Ordering::Relaxed)
        {
            warn!("conversion cancelled, killing pandoc");
            kill(child).await;
            return Err(ConvertError::Cancelled);
        }

        if start.elapsed() > timeout {
            warn!(timeout_secs = timeout.as_secs(), "conversion timed out, killing pandoc");
            kill(child).await;
            return Err(ConvertError::Timeout);
        }

        match child.try_wait() {
            Ok(Some(status)) => {
                if status.success() {
                    debug!(elapsed_ms = start.elapsed().as_millis() as u64, "pandoc completed");
                    return Ok(());
                }

                let exit_code = status.code().unwrap_or(-1);
                let stderr = if let Some(mut handle) = stderr_handle {
                    let mut buf = String::new();
                    let _ = handle.read_to_string(&mut buf).await;
                    buf.trim().to_string()
                } else {
                    String::new()
                };

                error!(exit_code, stderr = %stderr, "pandoc failed");
                return Err(ConvertError::Failed { exit_code, stderr });
            }
            Ok(None) => {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            Err(e) => {
                error!(error = %e, "error waiting for pandoc");
                return Err(ConvertError::Io(e));
            }
        }
    }
}

/// Kill the child and reap it so no zombie survives the request.
async fn kill(child: &mut tokio::process::Child) {
    let _ = child.start_kill();
    let _ = child.wait().await;
}
