//! API server setup and routing.

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::convert::Converter;
use crate::error::ConvertError;

use super::{
    handlers::{health_handler, runtime_handler, upload_handler},
    types::ApiState,
};

/// Build the router around a ready [`Converter`].
///
/// Routes:
/// - `POST /api/upload`
/// - `GET /api/runtime`
/// - `GET /health`
///
/// The request body limit comes from `max_upload_bytes`; CORS allows the
/// configured origins only, or none when the list is empty.
pub fn create_router(converter: Arc<Converter>) -> Router {
    let limit = converter.config().max_upload_bytes;
    let cors_layer = cors_layer(&converter.config().allowed_origins);
    let state = ApiState { converter };

    Router::new()
        .route("/api/upload", post(upload_handler))
        .route("/api/runtime", get(runtime_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(limit))
        .layer(RequestBodyLimitLayer::new(limit))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter(|s| !s.trim().is_empty())
        .filter_map(|s| match s.trim().parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %s, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        tracing::debug!("No CORS origins configured; cross-origin requests are not allowed");
        CorsLayer::new()
    } else {
        tracing::info!("CORS configured with {} allowed origin(s)", origins.len());
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Bind `host:port` and serve until the listener fails.
///
/// # Examples
///
/// ```no_run
/// use qbank_convert::{serve, ServiceConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), qbank_convert::ConvertError> {
///     serve("127.0.0.1", 3000, ServiceConfig::default()).await
/// }
/// ```
pub async fn serve(host: impl AsRef<str>, port: u16, config: ServiceConfig) -> Result<(), ConvertError> {
    let ip: IpAddr = host
        .as_ref()
        .parse()
        .map_err(|e| ConvertError::InvalidConfig(format!("Invalid host address: {e}")))?;
    let addr = SocketAddr::new(ip, port);

    let app = create_router(Arc::new(Converter::new(config)));

    tracing::info!("Starting qbank-convert server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ConvertError::InvalidConfig(format!("Cannot bind {addr}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ConvertError::InvalidConfig(format!("Server error: {e}")))?;

    Ok(())
}
