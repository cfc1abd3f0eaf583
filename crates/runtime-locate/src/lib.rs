//! # runtime-locate
//!
//! Find a working interpreter executable on the host before handing work to
//! scripts that need it.
//!
//! ## How it works
//!
//! On each call to [`RuntimeLocator::locate`]:
//!
//! 1. Builds the ordered candidate list: an optional explicit override first,
//!    then the platform list ([`default_candidates`]).
//! 2. Spawns each candidate once as `<candidate> --version`.
//! 3. Races the child against a timer (3 s by default). A candidate wins when
//!    it starts and exits with status 0 inside that window; a child still
//!    running when the timer fires is killed.
//! 4. Returns the first winner, or [`LocateError::NotFound`] listing every
//!    candidate that was tried together with installation guidance.
//!
//! Nothing is cached between calls and no candidate is probed twice per call.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use runtime_locate::RuntimeLocator;
//!
//! # async fn demo() -> Result<(), runtime_locate::LocateError> {
//! let runtime = RuntimeLocator::for_host().locate().await?;
//! println!("using {} ({})", runtime.executable, runtime.version);
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform candidates
//!
//! | OS      | Order                        |
//! |---------|------------------------------|
//! | Windows | `python`, `py`, `python3`    |
//! | other   | `python3`, `python`          |

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

// ── Public constants ─────────────────────────────────────────────────────────

/// Argument passed to every candidate during the probe.
pub const VERSION_ARG: &str = "--version";

/// How long a single candidate may take to answer [`VERSION_ARG`].
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

const WINDOWS_CANDIDATES: &[&str] = &["python", "py", "python3"];
const UNIX_CANDIDATES: &[&str] = &["python3", "python"];

/// Shown to users when no candidate answers.
pub const INSTALL_HINT: &str =
    "Python executable not found. Please install Python from https://python.org or Microsoft Store";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by runtime-locate operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    /// Every candidate failed to start, exited nonzero, or timed out.
    #[error("{hint}")]
    NotFound { tried: Vec<String>, hint: String },
}

// ── Result type ──────────────────────────────────────────────────────────────

/// A candidate that passed the probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedRuntime {
    /// The candidate exactly as it should be passed to `Command::new`.
    pub executable: String,
    /// First non-empty line the candidate printed for [`VERSION_ARG`]
    /// (stdout, falling back to stderr). Empty if it printed nothing.
    pub version: String,
}

// ── Candidate lists ──────────────────────────────────────────────────────────

/// The ordered candidate names for the current host.
pub fn default_candidates() -> Vec<String> {
    candidates_for_os(std::env::consts::OS)
}

/// The ordered candidate names for `os` (a `std::env::consts::OS` value).
pub fn candidates_for_os(os: &str) -> Vec<String> {
    let list = if os == "windows" {
        WINDOWS_CANDIDATES
    } else {
        UNIX_CANDIDATES
    };
    list.iter().map(|s| s.to_string()).collect()
}

// ── Locator ──────────────────────────────────────────────────────────────────

/// Probes an ordered list of interpreter candidates.
///
/// The list is fixed at construction; build one locator at startup and share
/// it, each [`locate`](Self::locate) call probes afresh.
#[derive(Debug, Clone)]
pub struct RuntimeLocator {
    candidates: Vec<String>,
    probe_timeout: Duration,
}

impl RuntimeLocator {
    /// Locator over [`default_candidates`] with [`DEFAULT_PROBE_TIMEOUT`].
    pub fn for_host() -> Self {
        Self::with_candidates(default_candidates())
    }

    /// Locator over an explicit candidate list.
    pub fn with_candidates(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Put `executable` ahead of the existing candidates.
    ///
    /// A later duplicate of the same name is dropped so it is not probed twice.
    pub fn prefer(mut self, executable: impl Into<String>) -> Self {
        let executable = executable.into();
        self.candidates.retain(|c| *c != executable);
        self.candidates.insert(0, executable);
        self
    }

    /// Override the per-candidate bound.
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// The ordered candidate list this locator will try.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Return the first candidate that answers the version probe.
    pub async fn locate(&self) -> Result<LocatedRuntime, LocateError> {
        for candidate in &self.candidates {
            match probe(candidate, self.probe_timeout).await {
                Some(version) => {
                    info!(executable = %candidate, %version, "Located runtime");
                    return Ok(LocatedRuntime {
                        executable: candidate.clone(),
                        version,
                    });
                }
                None => debug!(executable = %candidate, "Runtime candidate rejected"),
            }
        }

        warn!(tried = ?self.candidates, "No runtime candidate answered the version probe");
        Err(LocateError::NotFound {
            tried: self.candidates.clone(),
            hint: INSTALL_HINT.to_string(),
        })
    }
}

impl Default for RuntimeLocator {
    fn default() -> Self {
        Self::for_host()
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────────

/// Run `<candidate> --version` once. `Some(banner)` on a clean exit in time.
async fn probe(candidate: &str, bound: Duration) -> Option<String> {
    let mut child = match Command::new(candidate)
        .arg(VERSION_ARG)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            debug!(executable = %candidate, error = %e, "Runtime candidate failed to start");
            return None;
        }
    };

    // One budget covers the exit and the pipe reads; a grandchild holding
    // a pipe open must not stall the search.
    let deadline = Instant::now() + bound;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_task = tokio::spawn(read_all(stdout));
    let err_task = tokio::spawn(read_all(stderr));

    let status = match tokio::time::timeout_at(deadline, child.wait()).await {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            debug!(executable = %candidate, error = %e, "Waiting on runtime candidate failed");
            return None;
        }
        Err(_) => {
            debug!(executable = %candidate, timeout_ms = bound.as_millis() as u64, "Runtime candidate timed out");
            if let Err(e) = child.kill().await {
                warn!(executable = %candidate, error = %e, "Failed to kill timed-out runtime candidate");
            }
            out_task.abort();
            err_task.abort();
            return None;
        }
    };

    if !status.success() {
        debug!(executable = %candidate, code = ?status.code(), "Runtime candidate exited nonzero");
        return None;
    }

    let stdout = join_by(candidate, out_task, deadline).await;
    let stderr = join_by(candidate, err_task, deadline).await;
    Some(first_line(&stdout).or_else(|| first_line(&stderr)).unwrap_or_default())
}

/// Collect a pipe reader's output, giving up at `deadline`.
async fn join_by(candidate: &str, mut task: JoinHandle<String>, deadline: Instant) -> String {
    match tokio::time::timeout_at(deadline, &mut task).await {
        Ok(output) => output.unwrap_or_default(),
        Err(_) => {
            debug!(executable = %candidate, "Runtime candidate output still open after exit");
            task.abort();
            String::new()
        }
    }
}

async fn read_all<R>(reader: Option<R>) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut r) = reader {
        let _ = r.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn first_line(s: &str) -> Option<String> {
    s.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
