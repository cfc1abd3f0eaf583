//! Converter invocation: run one converter process and recover its archive.
//!
//! The converter runs as `<runtime> <program> <input>` with stdin closed.
//! Stdout and stderr are each drained by their own task *while* the process
//! runs; a converter that fills one pipe buffer while we wait on the other
//! would otherwise block forever. Both tasks are joined after the exit
//! status is in, before anything is inspected.
//!
//! There is no timeout and no cancellation. If the awaiting future is
//! dropped the child keeps running and the drain tasks keep reading until
//! it closes its pipes.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::error::ConvertError;
use crate::pipeline::artifact::{ArtifactKind, TempArtifact};
use crate::pipeline::protocol::{self, Resolution};

/// Everything one converter run produced.
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

/// The archive a converter produced. Removed when dropped or released.
#[derive(Debug)]
pub struct ResultArtifact {
    guard: TempArtifact,
    pub resolution: Resolution,
}

impl ResultArtifact {
    pub fn path(&self) -> &Path {
        self.guard.path()
    }

    pub fn release(self) {
        self.guard.release();
    }
}

/// Spawn the converter and wait for it, capturing both streams.
pub async fn run_converter(
    runtime: &str,
    program: &Path,
    input: &Path,
) -> Result<ConversionOutcome, ConvertError> {
    let start = Instant::now();

    info!(
        runtime = %runtime,
        program = %program.display(),
        input = %input.display(),
        "Starting converter"
    );

    let mut child = Command::new(runtime)
        .arg(program)
        .arg(input)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            error!(runtime = %runtime, program = %program.display(), error = %e, "Failed to start converter");
            ConvertError::ConversionFailed {
                message: format!("Processing failed: could not start converter: {e}"),
                exit_code: None,
                stderr: String::new(),
            }
        })?;

    let stdout_task = tokio::spawn(drain(child.stdout.take(), "stdout"));
    let stderr_task = tokio::spawn(drain(child.stderr.take(), "stderr"));

    let status = child.wait().await;

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    let status = status.map_err(|e| ConvertError::ConversionFailed {
        message: format!("Processing failed: could not wait for converter: {e}"),
        exit_code: None,
        stderr: stderr.clone(),
    })?;

    let duration_ms = start.elapsed().as_millis() as u64;
    debug!(code = ?status.code(), duration_ms, "Converter exited");

    Ok(ConversionOutcome {
        exit_code: status.code(),
        success: status.success(),
        stdout,
        stderr,
        duration_ms,
    })
}

/// Turn a finished run into the archive it reported.
pub async fn interpret_outcome(outcome: &ConversionOutcome) -> Result<ResultArtifact, ConvertError> {
    if !outcome.success {
        error!(code = ?outcome.exit_code, "Converter exited with failure");
        log_streams(outcome);
        return Err(ConvertError::process_failed(outcome.exit_code, outcome.stderr.clone()));
    }

    let resolved = protocol::parse_result_path(&outcome.stdout).map_err(|e| {
        error!(candidate = ?e.candidate(), "Invalid archive path from converter");
        log_streams(outcome);
        ConvertError::OutputProtocolViolation {
            candidate: e.candidate().map(str::to_string),
            stdout: outcome.stdout.clone(),
            stderr: outcome.stderr.clone(),
        }
    })?;

    let path = PathBuf::from(&resolved.path);
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        error!(path = %path.display(), "Converter reported an archive that does not exist");
        log_streams(outcome);
        return Err(ConvertError::output_missing(outcome.stderr.clone()));
    }

    info!(path = %path.display(), resolution = ?resolved.resolution, "Converter produced archive");

    Ok(ResultArtifact {
        guard: TempArtifact::new(path, ArtifactKind::ResultArchive),
        resolution: resolved.resolution,
    })
}

/// Run the converter on `input` and return the archive it produced.
pub async fn invoke(runtime: &str, program: &Path, input: &Path) -> Result<ResultArtifact, ConvertError> {
    let outcome = run_converter(runtime, program, input).await?;
    interpret_outcome(&outcome).await
}

/// Keep the full capture in the server log; the client only sees a summary.
fn log_streams(outcome: &ConversionOutcome) {
    error!(stdout = %outcome.stdout, "Full converter stdout");
    error!(stderr = %outcome.stderr, "Full converter stderr");
}

/// Read a child pipe to EOF, logging each line as it arrives.
async fn drain<R>(reader: Option<R>, stream: &'static str) -> String
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return String::new();
    };
    let mut reader = BufReader::new(reader);
    let mut captured = String::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                debug!(stream, line = %text.trim_end(), "converter output");
                captured.push_str(&text);
            }
            Err(e) => {
                debug!(stream, error = %e, "Stopped reading converter output");
                break;
            }
        }
    }

    captured
}
