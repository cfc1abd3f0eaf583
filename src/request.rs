//! Request types: the raw upload form and the validated conversion request.
//!
//! [`UploadForm`] is what arrives off the wire, every field optional.
//! [`UploadForm::validate`] is the single gate that turns it into a
//! [`ConversionRequest`]; nothing downstream re-checks presence or emptiness.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ConvertError, SelectorError};

/// Top-level document classification selecting a converter family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Mock,
    Section,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Mock => "Mock",
            Category::Section => "Section",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive.
impl FromStr for Category {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Mock" => Ok(Category::Mock),
            "Section" => Ok(Category::Section),
            other => Err(SelectorError::UnknownCategory {
                category: other.to_string(),
            }),
        }
    }
}

/// One uploaded file part.
#[derive(Clone)]
pub struct UploadedFile {
    /// Client-supplied file name, possibly empty.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// The multipart form as received: `file`, `category`, `questionType`.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub category: Option<String>,
    pub question_type: Option<String>,
}

impl UploadForm {
    /// Check presence of every field, the payload, and the file extension.
    ///
    /// Fields are checked in order `file`, `category`, `questionType`; the
    /// first missing one is reported. `accepted_extensions` is matched
    /// case-insensitively against the file name; an empty list accepts any.
    pub fn validate(self, accepted_extensions: &[String]) -> Result<ConversionRequest, ConvertError> {
        let file = self
            .file
            .ok_or_else(|| ConvertError::validation("No file uploaded"))?;
        let category = non_blank(self.category)
            .ok_or_else(|| ConvertError::validation("Category is required"))?;
        let subtype = non_blank(self.question_type)
            .ok_or_else(|| ConvertError::validation("Question type is required"))?;

        if file.bytes.is_empty() {
            return Err(ConvertError::validation("Uploaded file is empty"));
        }
        if !has_accepted_extension(&file.name, accepted_extensions) {
            return Err(ConvertError::validation(format!(
                "Unsupported file type '{}': expected {}",
                file.name,
                accepted_extensions
                    .iter()
                    .map(|e| format!(".{e}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        let category: Category = category.parse()?;

        Ok(ConversionRequest {
            payload: file.bytes,
            original_name: file.name,
            category,
            subtype,
        })
    }
}

/// A request that passed field validation.
///
/// The subtype is not yet known to be valid for the category; that is
/// decided by [`crate::pipeline::registry::ConverterRegistry::resolve`].
#[derive(Clone)]
pub struct ConversionRequest {
    pub payload: Vec<u8>,
    /// Used only to build a readable staging file name.
    pub original_name: String,
    pub category: Category,
    pub subtype: String,
}

impl fmt::Debug for ConversionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionRequest")
            .field("payload", &format_args!("<{} bytes>", self.payload.len()))
            .field("original_name", &self.original_name)
            .field("category", &self.category)
            .field("subtype", &self.subtype)
            .finish()
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

fn has_accepted_extension(name: &str, accepted: &[String]) -> bool {
    if accepted.is_empty() {
        return true;
    }
    let lower = name.to_lowercase();
    accepted
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext.trim_start_matches('.').to_lowercase())))
}
