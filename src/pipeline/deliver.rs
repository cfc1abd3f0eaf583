//! Result transport: read the archive into memory for the response.
//!
//! Archives are small, so the whole file is read in one go. The filename is
//! the archive's own base name as the converter chose it.

use tracing::{debug, error};

use crate::error::ConvertError;
use crate::pipeline::invoke::ResultArtifact;

pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Bytes and response metadata captured from one archive.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

/// Read the archive. The artifact itself is left for the caller to release.
pub async fn deliver(artifact: &ResultArtifact) -> Result<Delivery, ConvertError> {
    let path = artifact.path();
    let bytes = tokio::fs::read(path).await.map_err(|source| {
        error!(path = %path.display(), error = %source, "Failed to read output archive");
        ConvertError::ArtifactUnreadable {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.zip".to_string());

    debug!(bytes = bytes.len(), filename = %filename, "Captured output archive");

    Ok(Delivery {
        bytes,
        content_type: ARCHIVE_CONTENT_TYPE,
        filename,
    })
}

/// Make a filename safe to place inside a quoted `Content-Disposition` value.
///
/// Quotes, backslashes and control characters become `_`.
pub fn header_safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect()
}
