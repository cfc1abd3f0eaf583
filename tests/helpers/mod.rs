//! Shared fixtures: a scripts tree of fake converters run under `bash`.

#![allow(dead_code)]

use qbank_convert::ServiceConfig;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Writes the archive next to the staged input and reports it with the marker.
pub const MARKER_OK: &str = r#"out="${1%.*}.zip"
printf 'PK\003\004archive' > "$out"
echo "Processing $1"
echo '===ZIP==='
echo "$out"
echo 'Cleaning up'"#;

/// Reports the archive as the last line only.
pub const LEGACY_OK: &str = r#"out="${1%.*}.zip"
printf 'PK\003\004legacy' > "$out"
echo 'step 1'
echo "$out""#;

pub const EXIT_1: &str = r#"echo 'Traceback: docx parse error' >&2
exit 1"#;

pub const NO_PATH: &str = r#"echo 'Conversion successful!'
echo 'Done'"#;

pub const MISSING_ARCHIVE: &str = r#"echo '===ZIP==='
echo '/nonexistent/qbank/output.zip'"#;

/// Reports a directory where the archive should be, so reading it fails.
pub const UNREADABLE_ARCHIVE: &str = r#"out="${1%.*}.zip"
mkdir -p "$out"
echo '===ZIP==='
echo "$out""#;

pub struct Fixture {
    pub scripts: TempDir,
    pub staging: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        // RUST_LOG=qbank_convert=debug shows converter output lines.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        Self {
            scripts: tempfile::tempdir().unwrap(),
            staging: tempfile::tempdir().unwrap(),
        }
    }

    /// Install `body` as the entry point of converter family `family`.
    pub fn converter(&self, family: &str, body: &str) -> &Self {
        let dir = self.scripts.path().join(family);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("wordToMD.py"), body).unwrap();
        self
    }

    /// Install `body` under every family.
    pub fn all_converters(&self, body: &str) -> &Self {
        for family in ["mock_questions", "solutions_mock", "mcq_section", "question_passage"] {
            self.converter(family, body);
        }
        self
    }

    pub fn config(&self) -> ServiceConfig {
        self.config_with_runtime("bash")
    }

    pub fn config_with_runtime(&self, runtime: &str) -> ServiceConfig {
        ServiceConfig::builder()
            .scripts_dir(self.scripts.path())
            .staging_dir(self.staging.path())
            .runtime_candidates([runtime])
            .build()
            .unwrap()
    }

    /// Everything left in the staging directory.
    pub fn staged_files(&self) -> Vec<PathBuf> {
        list(self.staging.path())
    }

    /// Staged uploads left behind (ignores converter by-products).
    pub fn staged_inputs(&self) -> Vec<PathBuf> {
        self.staged_files()
            .into_iter()
            .filter(|p| p.extension().is_some_and(|e| e == "docx" || e == "part"))
            .collect()
    }
}

fn list(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}
