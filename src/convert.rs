//! The request orchestrator.
//!
//! One request moves through
//! `Validating → Resolving → Staging → Invoking → Parsing → Delivering → Cleanup → Done`,
//! and any stage may end it early. Resolving runs before Staging, so a bad
//! selector is rejected before anything touches the disk.
//!
//! Cleanup does not depend on reaching a particular line: the staged input
//! and the result archive each live in a drop guard (see
//! [`crate::pipeline::artifact`]). The happy path releases them explicitly
//! so the removal is logged in order; every other path removes them when
//! the guard goes out of scope.
//!
//! A guard dropped mid-run would delete the input while the converter is
//! still reading it. [`Converter::submit`] therefore runs the whole pipeline
//! on its own task, and dropping the caller's future leaves it running to
//! completion.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use runtime_locate::{LocatedRuntime, RuntimeLocator};
use tracing::{debug, error, info, warn};

use crate::config::ServiceConfig;
use crate::error::{ConvertError, StatusClass};
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::invoke::{self, ConversionOutcome};
use crate::pipeline::registry::{ConverterRegistry, ConverterTarget};
use crate::pipeline::stage::{self, StagedInput};
use crate::pipeline::deliver;
use crate::request::{Category, ConversionRequest, UploadForm, UploadedFile};

/// Lifecycle stage of one request, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Resolving,
    Staging,
    Invoking,
    Parsing,
    Delivering,
    Cleanup,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Validating => "validating",
            Stage::Resolving => "resolving",
            Stage::Staging => "staging",
            Stage::Invoking => "invoking",
            Stage::Parsing => "parsing",
            Stage::Delivering => "delivering",
            Stage::Cleanup => "cleanup",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Runs conversions. Cheap to share behind an `Arc`; holds no per-request state.
#[derive(Debug)]
pub struct Converter {
    config: Arc<ServiceConfig>,
    registry: ConverterRegistry,
    locator: RuntimeLocator,
}

impl Converter {
    /// Build the converter table and interpreter candidate list from `config`.
    pub fn new(config: ServiceConfig) -> Self {
        let registry = ConverterRegistry::new(config.scripts_dir.clone(), config.entry_point.clone());

        let mut locator = match &config.runtime_candidates {
            Some(candidates) => RuntimeLocator::with_candidates(candidates.clone()),
            None => RuntimeLocator::for_host(),
        };
        if let Some(exe) = &config.runtime_override {
            locator = locator.prefer(exe.clone());
        }
        let locator = locator.probe_timeout(Duration::from_secs(config.probe_timeout_secs));

        debug!(
            scripts_dir = %config.scripts_dir.display(),
            candidates = ?locator.candidates(),
            "Converter ready"
        );

        Self {
            config: Arc::new(config),
            registry,
            locator,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    /// Run [`Converter::handle`] on a spawned task and wait for it.
    ///
    /// Dropping the returned future does not cancel the conversion; both
    /// temp files are still removed once the converter exits.
    pub async fn submit(self: &Arc<Self>, form: UploadForm) -> Result<ConversionOutput, ConvertError> {
        let converter = Arc::clone(self);
        tokio::spawn(async move { converter.handle(form).await })
            .await
            .map_err(|e| {
                let e = ConvertError::Internal(format!("Conversion task failed: {e}"));
                failed(Stage::Invoking, e)
            })?
    }

    /// Validate a raw upload form, then convert it.
    pub async fn handle(&self, form: UploadForm) -> Result<ConversionOutput, ConvertError> {
        enter(Stage::Validating);
        let request = form
            .validate(&self.config.accepted_extensions)
            .map_err(|e| failed(Stage::Validating, e))?;
        self.convert(request).await
    }

    /// Convert an already validated request.
    pub async fn convert(&self, request: ConversionRequest) -> Result<ConversionOutput, ConvertError> {
        let start = Instant::now();
        info!(
            category = %request.category,
            subtype = %request.subtype,
            name = %request.original_name,
            bytes = request.payload.len(),
            "Starting conversion"
        );

        enter(Stage::Resolving);
        let target = self
            .registry
            .resolve(request.category, &request.subtype)
            .map_err(|e| failed(Stage::Resolving, e.into()))?;
        debug!(family = target.family, program = %target.program_path.display(), "Resolved converter");

        enter(Stage::Staging);
        let staged = stage::stage(&self.config.staging_dir, &request.payload, &request.original_name)
            .await
            .map_err(|e| failed(Stage::Staging, e))?;

        let result = self.run(&target, &staged, start).await;

        enter(Stage::Cleanup);
        staged.release();

        if let Ok(output) = &result {
            enter(Stage::Done);
            info!(
                filename = %output.filename,
                bytes = output.stats.archive_bytes,
                total_ms = output.stats.total_duration_ms,
                "Conversion complete"
            );
        }
        result
    }

    async fn run(
        &self,
        target: &ConverterTarget,
        staged: &StagedInput,
        start: Instant,
    ) -> Result<ConversionOutput, ConvertError> {
        enter(Stage::Invoking);
        let runtime = self
            .locator
            .locate()
            .await
            .map_err(|e| failed(Stage::Invoking, e.into()))?;
        let outcome: ConversionOutcome =
            invoke::run_converter(&runtime.executable, &target.program_path, staged.path())
                .await
                .map_err(|e| failed(Stage::Invoking, e))?;

        enter(Stage::Parsing);
        let artifact = invoke::interpret_outcome(&outcome)
            .await
            .map_err(|e| failed(Stage::Parsing, e))?;

        enter(Stage::Delivering);
        let delivery = deliver::deliver(&artifact).await;
        let resolution = artifact.resolution;
        artifact.release();
        let delivery = delivery.map_err(|e| failed(Stage::Delivering, e))?;

        let stats = ConversionStats {
            family: target.family.to_string(),
            runtime: runtime.executable,
            resolution: Some(resolution),
            archive_bytes: delivery.bytes.len() as u64,
            converter_duration_ms: outcome.duration_ms,
            total_duration_ms: start.elapsed().as_millis() as u64,
        };

        Ok(ConversionOutput {
            bytes: delivery.bytes,
            content_type: delivery.content_type,
            filename: delivery.filename,
            stats,
        })
    }

    /// Run the interpreter probe on its own.
    pub async fn check_runtime(&self) -> Result<LocatedRuntime, ConvertError> {
        self.locator.locate().await.map_err(ConvertError::from)
    }
}

/// Convert a local document and write the archive into `out_dir`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
/// Returns the written path.
pub async fn convert_to_dir(
    converter: &Converter,
    input: impl AsRef<Path>,
    category: Category,
    subtype: &str,
    out_dir: impl AsRef<Path>,
) -> Result<(PathBuf, ConversionStats), ConvertError> {
    let input = input.as_ref();
    let out_dir = out_dir.as_ref();

    let bytes = tokio::fs::read(input)
        .await
        .map_err(|e| ConvertError::validation(format!("Cannot read '{}': {e}", input.display())))?;
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let form = UploadForm {
        file: Some(UploadedFile { name, bytes }),
        category: Some(category.to_string()),
        question_type: Some(subtype.to_string()),
    };
    let output = converter.handle(form).await?;

    let path = write_atomically(out_dir, &output.filename, &output.bytes).await?;
    info!(path = %path.display(), "Wrote archive");
    Ok((path, output.stats))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Write to `.<filename>.tmp`, then rename, so `filename` is never partial.
async fn write_atomically(out_dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, ConvertError> {
    let path = out_dir.join(filename);
    let write_err = |source: std::io::Error| ConvertError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(out_dir).await.map_err(write_err)?;

    let tmp_path = out_dir.join(format!(".{filename}.tmp"));
    if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
        discard_tmp(&tmp_path).await;
        return Err(write_err(e));
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
        discard_tmp(&tmp_path).await;
        return Err(write_err(e));
    }
    Ok(path)
}

async fn discard_tmp(tmp_path: &Path) {
    match tokio::fs::remove_file(tmp_path).await {
        Ok(()) => debug!(path = %tmp_path.display(), "Removed temp output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %tmp_path.display(), error = %e, "Failed to remove temp output"),
    }
}

fn enter(stage: Stage) {
    debug!(%stage, "Entering stage");
}

fn failed(stage: Stage, e: ConvertError) -> ConvertError {
    match e.status_class() {
        StatusClass::Client => warn!(%stage, error = %e, "Request rejected"),
        StatusClass::Server => error!(%stage, error = %e, "Conversion failed"),
    }
    e
}
