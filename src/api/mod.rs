//! HTTP surface for the conversion service.
//!
//! # Endpoints
//!
//! - `POST /api/upload` - Convert an uploaded document (multipart: `file`, `category`, `questionType`)
//! - `GET /api/runtime` - Report whether a Python interpreter is available
//! - `GET /health` - Health check endpoint
//!
//! # cURL Examples
//!
//! ```bash
//! curl -F "file=@paper.docx" -F "category=Mock" -F "questionType=question" \
//!      -OJ http://localhost:3000/api/upload
//!
//! curl http://localhost:3000/api/runtime
//! ```

mod error;
mod handlers;
pub mod server;
mod types;

pub use error::ApiError;
pub use server::{create_router, serve};
pub use types::{ApiState, ErrorResponse, HealthResponse, RuntimeResponse};
