//! Converter output protocol.
//!
//! A converter reports its archive on stdout. Lines are trimmed and blank
//! lines dropped, then:
//!
//! 1. **Marker**: if a line equals [`ZIP_MARKER`] and another line follows
//!    it, the line right after the marker is the archive path. Anything
//!    printed after that line is ignored.
//! 2. **Last line**: otherwise the last non-blank line is the archive path.
//!    Older converters only print a final path and rely on this.
//!
//! Whichever tier matched, the candidate must end in [`ARCHIVE_EXTENSION`].
//! A diagnostic last line that happens to end in `.zip` is accepted as a
//! path under tier 2; the existence check in the invoker is what catches it.

use serde::{Deserialize, Serialize};

/// Line that announces the archive path on the next line.
pub const ZIP_MARKER: &str = "===ZIP===";

/// Required suffix of a reported archive path.
pub const ARCHIVE_EXTENSION: &str = ".zip";

/// Which rule produced the archive path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Marker,
    LastLine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: String,
    pub resolution: Resolution,
}

/// Why stdout could not be read as an archive path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Stdout had no non-blank lines.
    Empty,
    /// A candidate was found but does not end in [`ARCHIVE_EXTENSION`].
    NotAnArchive(ResolvedPath),
}

impl ProtocolError {
    pub fn candidate(&self) -> Option<&str> {
        match self {
            ProtocolError::Empty => None,
            ProtocolError::NotAnArchive(r) => Some(&r.path),
        }
    }
}

/// Pick the archive path candidate out of `stdout` without validating it.
pub fn find_candidate(stdout: &str) -> Option<ResolvedPath> {
    let lines: Vec<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if let Some(idx) = lines.iter().position(|l| *l == ZIP_MARKER) {
        if let Some(next) = lines.get(idx + 1) {
            return Some(ResolvedPath {
                path: next.to_string(),
                resolution: Resolution::Marker,
            });
        }
    }

    lines.last().map(|l| ResolvedPath {
        path: l.to_string(),
        resolution: Resolution::LastLine,
    })
}

/// Resolve and validate the archive path reported on `stdout`.
pub fn parse_result_path(stdout: &str) -> Result<ResolvedPath, ProtocolError> {
    let resolved = find_candidate(stdout).ok_or(ProtocolError::Empty)?;
    if resolved.path.is_empty() || !resolved.path.ends_with(ARCHIVE_EXTENSION) {
        return Err(ProtocolError::NotAnArchive(resolved));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_line_wins() {
        let r = parse_result_path("noise\n===ZIP===\n/tmp/out.zip\n").unwrap();
        assert_eq!(r.path, "/tmp/out.zip");
        assert_eq!(r.resolution, Resolution::Marker);
    }

    #[test]
    fn marker_takes_next_line_not_last_line() {
        let stdout = "Converting...\n===ZIP===\n/tmp/out.zip\nCleaning up\n/tmp/other.zip\n";
        let r = parse_result_path(stdout).unwrap();
        assert_eq!(r.path, "/tmp/out.zip");
        assert_eq!(r.resolution, Resolution::Marker);
    }

    #[test]
    fn blank_lines_and_padding_are_ignored() {
        let r = parse_result_path("\n\n   ===ZIP===  \n\n\t/tmp/out.zip  \r\n\n").unwrap();
        assert_eq!(r.path, "/tmp/out.zip");
        assert_eq!(r.resolution, Resolution::Marker);
    }

    #[test]
    fn legacy_last_line_fallback() {
        let r = parse_result_path("line1\nline2\n/tmp/legacy.zip\n").unwrap();
        assert_eq!(r.path, "/tmp/legacy.zip");
        assert_eq!(r.resolution, Resolution::LastLine);
    }

    #[test]
    fn marker_on_last_line_falls_back_to_last_line() {
        // Nothing follows the marker, so the marker itself is the last line.
        let err = parse_result_path("/tmp/a.zip\n===ZIP===\n").unwrap_err();
        assert_eq!(err.candidate(), Some(ZIP_MARKER));
    }

    #[test]
    fn non_archive_candidate_is_rejected() {
        let err = parse_result_path("Conversion successful!\nDone\n").unwrap_err();
        match err {
            ProtocolError::NotAnArchive(r) => {
                assert_eq!(r.path, "Done");
                assert_eq!(r.resolution, Resolution::LastLine);
            }
            other => panic!("unexpected: {other:?}"),
        }

        let err = parse_result_path("===ZIP===\n/tmp/out.tar.gz\n").unwrap_err();
        assert_eq!(err.candidate(), Some("/tmp/out.tar.gz"));
    }

    #[test]
    fn extension_match_is_case_sensitive() {
        assert!(parse_result_path("/tmp/OUT.ZIP").is_err());
    }

    #[test]
    fn empty_stdout_is_rejected() {
        assert_eq!(parse_result_path(""), Err(ProtocolError::Empty));
        assert_eq!(parse_result_path("\n   \n\t\n"), Err(ProtocolError::Empty));
    }

    #[test]
    fn coincidental_zip_diagnostic_is_accepted_as_path() {
        let r = parse_result_path("warning: skipped image in backup.zip").unwrap();
        assert_eq!(r.path, "warning: skipped image in backup.zip");
        assert_eq!(r.resolution, Resolution::LastLine);
    }
}
