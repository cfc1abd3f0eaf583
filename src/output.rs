//! Conversion results.

use serde::{Deserialize, Serialize};

use crate::pipeline::protocol::Resolution;

/// A finished conversion: the archive bytes plus how they were produced.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// Full archive content.
    pub bytes: Vec<u8>,
    /// Always `application/zip`.
    pub content_type: &'static str,
    /// Base name of the archive the converter wrote.
    pub filename: String,
    pub stats: ConversionStats,
}

/// Per-request timings and routing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Converter family directory, e.g. `mock_questions`.
    pub family: String,
    /// Interpreter used to run the converter.
    pub runtime: String,
    /// Which stdout rule located the archive.
    pub resolution: Option<Resolution>,
    pub archive_bytes: u64,
    pub converter_duration_ms: u64,
    pub total_duration_ms: u64,
}
