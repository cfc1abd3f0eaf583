//! Scoped ownership of request temp files.
//!
//! A [`TempArtifact`] is created the moment a file exists on disk that the
//! current request is responsible for. It makes exactly one removal attempt:
//! either when [`TempArtifact::release`] is called, or when it is dropped,
//! whichever comes first. That covers early returns via `?`, panics, and a
//! handler future being dropped mid-request. A failed removal is logged at
//! `warn` and never surfaces as an error.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What kind of file a [`TempArtifact`] holds, for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    StagedInput,
    ResultArchive,
}

impl ArtifactKind {
    fn label(self) -> &'static str {
        match self {
            ArtifactKind::StagedInput => "staged input",
            ArtifactKind::ResultArchive => "result archive",
        }
    }
}

#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    kind: ArtifactKind,
    armed: bool,
}

impl TempArtifact {
    pub fn new(path: PathBuf, kind: ArtifactKind) -> Self {
        Self {
            path,
            kind,
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now. Consumes the guard so `Drop` does nothing more.
    pub fn release(mut self) {
        self.remove_once();
    }

    fn remove_once(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(kind = self.kind.label(), path = %self.path.display(), "Removed temp file"),
            Err(e) => warn!(
                kind = self.kind.label(),
                path = %self.path.display(),
                error = %e,
                "Failed to delete temp file"
            ),
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        self.remove_once();
    }
}
