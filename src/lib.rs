//! # qbank-convert
//!
//! Turn an uploaded question-bank document into a downloadable archive by
//! running one of four external converter programs.
//!
//! ## Pipeline Overview
//!
//! ```text
//! multipart upload
//!  │
//!  ├─ 1. Validate  file / category / questionType present, payload non-empty
//!  ├─ 2. Resolve   (category, subtype) → scripts/<family>/wordToMD.py
//!  ├─ 3. Stage     write upload as <millis>-<sanitised name>
//!  ├─ 4. Invoke    <python> <program> <staged path>, both pipes drained
//!  ├─ 5. Parse     archive path after `===ZIP===`, else the last stdout line
//!  ├─ 6. Deliver   read the .zip into memory
//!  └─ 7. Cleanup   staged input and archive removed on every path
//! ```
//!
//! ## Converter table
//!
//! | category | questionType   | family             |
//! |----------|----------------|--------------------|
//! | `Mock`   | `question`     | `mock_questions`   |
//! | `Mock`   | `solution`     | `solutions_mock`   |
//! | `Section`| `section, mcq` | `mcq_section`      |
//! | `Section`| `passage`      | `question_passage` |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qbank_convert::{Converter, ServiceConfig, UploadForm, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder().scripts_dir("./scripts").build()?;
//!     let converter = Converter::new(config);
//!     let form = UploadForm {
//!         file: Some(UploadedFile {
//!             name: "paper.docx".into(),
//!             bytes: std::fs::read("paper.docx")?,
//!         }),
//!         category: Some("Mock".into()),
//!         question_type: Some("question".into()),
//!     };
//!     let output = converter.handle(form).await?;
//!     std::fs::write(&output.filename, &output.bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `qbank-convert` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod request;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::server::{create_router, serve};
pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use convert::{convert_to_dir, Converter, Stage};
pub use error::{ConvertError, SelectorError, StatusClass};
pub use output::{ConversionOutput, ConversionStats};
pub use pipeline::protocol::{Resolution, ZIP_MARKER};
pub use request::{Category, ConversionRequest, UploadForm, UploadedFile};
pub use runtime_locate::{LocateError, LocatedRuntime};
