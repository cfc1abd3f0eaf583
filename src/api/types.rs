//! API request and response types.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::convert::Converter;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct ApiState {
    pub converter: Arc<Converter>,
}

/// Body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Interpreter check response.
///
/// `executable` and `version` are set when a candidate answered the probe,
/// `error` when none did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeResponse {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
