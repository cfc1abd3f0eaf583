//! Converter table: (category, subtype) → converter program.
//!
//! The table is exhaustive and has no default row. Resolution does no I/O;
//! whether the program actually exists is discovered when it is run.

use std::path::{Path, PathBuf};

use crate::error::SelectorError;
use crate::request::Category;

/// Every valid (category, subtype, family-directory) row.
pub const CONVERTER_TABLE: &[(Category, &str, &str)] = &[
    (Category::Mock, "question", "mock_questions"),
    (Category::Mock, "solution", "solutions_mock"),
    (Category::Section, "section, mcq", "mcq_section"),
    (Category::Section, "passage", "question_passage"),
];

/// The converter program chosen for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterTarget {
    /// Family directory name, e.g. `mock_questions`.
    pub family: &'static str,
    pub program_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ConverterRegistry {
    scripts_dir: PathBuf,
    entry_point: String,
}

impl ConverterRegistry {
    pub fn new(scripts_dir: impl Into<PathBuf>, entry_point: impl Into<String>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            entry_point: entry_point.into(),
        }
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    pub fn resolve(&self, category: Category, subtype: &str) -> Result<ConverterTarget, SelectorError> {
        CONVERTER_TABLE
            .iter()
            .find(|(c, s, _)| *c == category && *s == subtype)
            .map(|&(_, _, family)| ConverterTarget {
                family,
                program_path: self.scripts_dir.join(family).join(&self.entry_point),
            })
            .ok_or_else(|| SelectorError::UnknownSubtype {
                category,
                subtype: subtype.to_string(),
            })
    }

    /// Parse `category` first so an unknown category is reported as such.
    pub fn resolve_str(&self, category: &str, subtype: &str) -> Result<ConverterTarget, SelectorError> {
        let category: Category = category.parse()?;
        self.resolve(category, subtype)
    }

    /// Subtypes valid for `category`, in table order.
    pub fn subtypes(category: Category) -> impl Iterator<Item = &'static str> {
        CONVERTER_TABLE
            .iter()
            .filter(move |(c, _, _)| *c == category)
            .map(|(_, s, _)| *s)
    }
}
