//! Staging: persist an upload where the converter can read it.
//!
//! The staged name is `<unix-millis>-<sanitised original name>` inside the
//! configured staging directory. Two uploads with the same sanitised name in
//! the same millisecond would collide; that risk is accepted.
//!
//! The payload is written to a hidden `tempfile` in the same directory and
//! persisted under the final name, so that name never shows a partially
//! written file. A failed write drops the temp file, which removes it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::error::ConvertError;
use crate::pipeline::artifact::{ArtifactKind, TempArtifact};

/// Anything outside ASCII word characters, whitespace, `.` and `-`.
static RE_UNSAFE_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\s.\-]").unwrap());

const FILLER: &str = "_";

/// Replace every character outside the permitted set with `_`.
///
/// Path separators are outside the set, so the result is always a single
/// path component.
pub fn sanitize_file_name(name: &str) -> String {
    RE_UNSAFE_NAME_CHARS.replace_all(name, FILLER).into_owned()
}

/// The request's upload, on disk. Removed when dropped or released.
#[derive(Debug)]
pub struct StagedInput {
    guard: TempArtifact,
    pub created_at: SystemTime,
}

impl StagedInput {
    pub fn path(&self) -> &Path {
        self.guard.path()
    }

    /// Delete the staged file now. Failure is logged, never returned.
    pub fn release(self) {
        self.guard.release();
    }
}

/// Write `payload` to a freshly named file in `dir`.
pub async fn stage(dir: &Path, payload: &[u8], original_name: &str) -> Result<StagedInput, ConvertError> {
    let created_at = SystemTime::now();
    let millis = created_at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let dir = absolute(dir);
    let path = dir.join(format!("{millis}-{}", sanitize_file_name(original_name)));

    let fail = |source: std::io::Error| ConvertError::StagingFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(&dir).await.map_err(fail)?;

    let bytes = payload.to_vec();
    let target = path.clone();
    tokio::task::spawn_blocking(move || write_persisted(&dir, &target, &bytes))
        .await
        .map_err(|e| fail(std::io::Error::other(e)))?
        .map_err(fail)?;

    debug!(bytes = payload.len(), "Wrote staged upload");
    info!(path = %path.display(), "Staged upload");

    Ok(StagedInput {
        guard: TempArtifact::new(path, ArtifactKind::StagedInput),
        created_at,
    })
}

/// Write `bytes` to a temp file in `dir`, then rename it to `target`.
fn write_persisted(dir: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".staging-")
        .suffix(".part")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

fn absolute(dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(dir))
            .unwrap_or_else(|_| dir.to_path_buf())
    }
}
