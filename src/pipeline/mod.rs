//! Pipeline stages for upload-to-archive conversion.
//!
//! Each submodule implements exactly one step and is testable on its own.
//! The orchestrator in [`crate::convert`] is the only place that strings
//! them together.
//!
//! ## Data Flow
//!
//! ```text
//! registry ──▶ stage ──▶ invoke ──▶ protocol ──▶ deliver
//! (resolve)   (temp file) (process)  (stdout)     (read zip)
//! ```
//!
//! 1. [`registry`] : map (category, subtype) to a converter program; pure
//! 2. [`stage`]    : write the upload under a timestamped, sanitised name
//! 3. [`invoke`]   : run the converter with both pipes drained concurrently
//! 4. [`protocol`] : find the archive path in stdout (`===ZIP===` or last line)
//! 5. [`deliver`]  : read the archive into memory for the response
//!
//! [`artifact`] holds the drop guard both temp files live in, so every exit
//! path removes them.

pub mod artifact;
pub mod deliver;
pub mod invoke;
pub mod protocol;
pub mod registry;
pub mod stage;
