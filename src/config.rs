//! Service configuration.
//!
//! All behaviour is controlled through [`ServiceConfig`], built via its
//! [`ServiceConfigBuilder`]. The converter table and the runtime candidate
//! list are derived from it once, when [`crate::Converter::new`] runs.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the conversion service.
///
/// # Example
/// ```rust
/// use qbank_convert::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .scripts_dir("/opt/qbank/scripts")
///     .runtime_override("/usr/bin/python3.12")
///     .max_upload_bytes(20 * 1024 * 1024)
///     .build()
///     .unwrap();
/// assert_eq!(config.probe_timeout_secs, 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Directory holding one sub-directory per converter family. Default: `./scripts`.
    pub scripts_dir: PathBuf,

    /// Script file name inside each family directory. Default: `wordToMD.py`.
    pub entry_point: String,

    /// Where uploads are staged for the converter. Default: the OS temp dir.
    pub staging_dir: PathBuf,

    /// Interpreter names probed in order. `None` uses the host list
    /// (`python3`, `python` on unix; `python`, `py`, `python3` on Windows).
    pub runtime_candidates: Option<Vec<String>>,

    /// An interpreter probed before every candidate.
    pub runtime_override: Option<String>,

    /// Per-candidate bound for the `--version` probe. Default: 3.
    pub probe_timeout_secs: u64,

    /// File extensions accepted for upload, without the dot. Default: `["docx"]`.
    /// Empty accepts any file name.
    pub accepted_extensions: Vec<String>,

    /// Maximum request body size. Default: 100 MiB.
    pub max_upload_bytes: usize,

    /// Origins allowed by CORS. Default: none (same-origin only).
    pub allowed_origins: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            scripts_dir: PathBuf::from("./scripts"),
            entry_point: "wordToMD.py".to_string(),
            staging_dir: std::env::temp_dir(),
            runtime_candidates: None,
            runtime_override: None,
            probe_timeout_secs: 3,
            accepted_extensions: vec!["docx".to_string()],
            max_upload_bytes: 100 * 1024 * 1024,
            allowed_origins: Vec::new(),
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn scripts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scripts_dir = dir.into();
        self
    }

    pub fn entry_point(mut self, name: impl Into<String>) -> Self {
        self.config.entry_point = name.into();
        self
    }

    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.staging_dir = dir.into();
        self
    }

    pub fn runtime_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.runtime_candidates = Some(candidates.into_iter().map(Into::into).collect());
        self
    }

    pub fn runtime_override(mut self, executable: impl Into<String>) -> Self {
        self.config.runtime_override = Some(executable.into());
        self
    }

    pub fn probe_timeout_secs(mut self, secs: u64) -> Self {
        self.config.probe_timeout_secs = secs;
        self
    }

    pub fn accepted_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.accepted_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, ConvertError> {
        let c = &self.config;
        if c.probe_timeout_secs == 0 {
            return Err(ConvertError::InvalidConfig(
                "Probe timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(ConvertError::InvalidConfig(
                "Maximum upload size must be > 0".into(),
            ));
        }
        if c.entry_point.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "Converter entry point must not be empty".into(),
            ));
        }
        if matches!(&c.runtime_candidates, Some(list) if list.is_empty())
            && c.runtime_override.is_none()
        {
            return Err(ConvertError::InvalidConfig(
                "At least one runtime candidate is required".into(),
            ));
        }
        Ok(self.config)
    }
}
