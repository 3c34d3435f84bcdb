//! API server setup and configuration.

use std::net::{IpAddr, SocketAddr};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::{PreviewConfig, PreviewError, Previewer, Result, render::check_libreoffice_available};

use super::{
    handlers::{health_handler, info_handler, preview_handler},
    types::{ApiSizeLimits, ApiState},
};

/// Parse the upload size limit from environment variables.
///
/// Reads, in order of preference:
/// 1. `DOCPREVIEW_MAX_UPLOAD_BYTES` - maximum request body size in bytes
/// 2. `DOCPREVIEW_MAX_UPLOAD_SIZE_MB` - the same limit in MB
///
/// Falls back to the 100 MB default if neither is set or valid.
pub fn parse_size_limits_from_env() -> ApiSizeLimits {
    if let Ok(value) = std::env::var("DOCPREVIEW_MAX_UPLOAD_BYTES") {
        match value.parse::<usize>() {
            Ok(bytes) if bytes > 0 => {
                tracing::info!(
                    "Upload size limit configured from environment: {} bytes ({:.1} MB)",
                    bytes,
                    bytes as f64 / (1024.0 * 1024.0)
                );
                return ApiSizeLimits::new(bytes);
            }
            _ => tracing::warn!(
                "Failed to parse DOCPREVIEW_MAX_UPLOAD_BYTES='{}', must be a positive integer",
                value
            ),
        }
    }

    if let Ok(value) = std::env::var("DOCPREVIEW_MAX_UPLOAD_SIZE_MB") {
        match value.parse::<usize>() {
            Ok(mb) if mb > 0 => {
                tracing::info!("Upload size limit configured from environment: {} MB", mb);
                return ApiSizeLimits::from_mb(mb);
            }
            _ => tracing::warn!(
                "Failed to parse DOCPREVIEW_MAX_UPLOAD_SIZE_MB='{}', must be a positive integer",
                value
            ),
        }
    }

    let limits = ApiSizeLimits::default();
    tracing::info!(
        "Upload size limit: 100 MB (default, {} bytes) - Configure with DOCPREVIEW_MAX_UPLOAD_BYTES",
        limits.max_upload_bytes
    );
    limits
}

fn cors_layer_from_env() -> CorsLayer {
    let Ok(origins_str) = std::env::var("DOCPREVIEW_CORS_ORIGINS") else {
        tracing::warn!(
            "CORS configured to allow all origins (default). Set DOCPREVIEW_CORS_ORIGINS to a \
             comma-separated list of allowed origins to restrict it."
        );
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    };

    let origins: Vec<_> = origins_str
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("DOCPREVIEW_CORS_ORIGINS set but empty/invalid - falling back to permissive CORS");
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    tracing::info!("CORS configured with {} explicit allowed origin(s)", origins.len());
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the API router with all routes configured.
///
/// Public so the router can be nested into a larger application.
///
/// # Examples
///
/// ```no_run
/// use docpreview::{PreviewConfig, Previewer, api::create_router};
///
/// # fn main() -> docpreview::Result<()> {
/// let previewer = Previewer::with_libreoffice(PreviewConfig::default())?;
/// let app = axum::Router::new().nest("/docs", create_router(previewer));
/// # Ok(())
/// # }
/// ```
pub fn create_router(previewer: Previewer) -> Router {
    create_router_with_limits(previewer, ApiSizeLimits::default())
}

/// Create the API router with a custom upload size limit.
pub fn create_router_with_limits(previewer: Previewer, limits: ApiSizeLimits) -> Router {
    let state = ApiState { previewer };

    Router::new()
        .route("/preview", post(preview_handler))
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .layer(DefaultBodyLimit::max(limits.max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(limits.max_upload_bytes))
        .layer(cors_layer_from_env())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server with config file discovery.
///
/// Searches for `docpreview.toml` in the current and parent directories and
/// falls back to the default configuration. The upload limit is read from the
/// environment.
///
/// # Examples
///
/// ```no_run
/// use docpreview::api::serve;
///
/// #[tokio::main]
/// async fn main() -> docpreview::Result<()> {
///     serve("127.0.0.1", 8000).await
/// }
/// ```
///
/// # Environment Variables
///
/// ```bash
/// export DOCPREVIEW_CORS_ORIGINS="https://app.example.com"
/// export DOCPREVIEW_MAX_UPLOAD_BYTES=104857600
/// export DOCPREVIEW_LIBREOFFICE_PATH=/opt/libreoffice/program/soffice
/// ```
pub async fn serve(host: impl AsRef<str>, port: u16) -> Result<()> {
    let config = match PreviewConfig::discover()? {
        Some(config) => {
            tracing::info!("Loaded preview config from discovered file");
            config
        }
        None => {
            tracing::info!("No config file found, using default configuration");
            PreviewConfig::default()
        }
    };

    serve_with_config_and_limits(host, port, config, parse_size_limits_from_env()).await
}

/// Start the API server with explicit config and the default upload limit.
pub async fn serve_with_config(host: impl AsRef<str>, port: u16, config: PreviewConfig) -> Result<()> {
    serve_with_config_and_limits(host, port, config, ApiSizeLimits::default()).await
}

/// Start the API server with explicit config and upload limit.
///
/// The server starts even when LibreOffice is missing; conversions then fail
/// with `MissingDependency` (HTTP 503) until it is installed.
pub async fn serve_with_config_and_limits(
    host: impl AsRef<str>,
    port: u16,
    config: PreviewConfig,
    limits: ApiSizeLimits,
) -> Result<()> {
    match check_libreoffice_available(config.libreoffice.binary.as_deref()).await {
        Ok(path) => tracing::info!("Using LibreOffice at {}", path.display()),
        Err(e) => tracing::warn!("{}", e),
    }

    let previewer = Previewer::with_libreoffice(config)?;
    serve_previewer(host, port, previewer, limits).await
}

/// Start the API server around an existing previewer.
///
/// Use this to serve a custom [`Renderer`](crate::render::Renderer).
pub async fn serve_previewer(
    host: impl AsRef<str>,
    port: u16,
    previewer: Previewer,
    limits: ApiSizeLimits,
) -> Result<()> {
    let ip: IpAddr = host
        .as_ref()
        .parse()
        .map_err(|e| PreviewError::validation(format!("Invalid host address: {}", e)))?;

    let addr = SocketAddr::new(ip, port);
    tracing::info!(
        "Staging directory: {} (renderer: {})",
        previewer.staging().dir().display(),
        previewer.renderer_name()
    );
    let app = create_router_with_limits(previewer, limits);

    tracing::info!("Starting docpreview server on http://{}:{}", ip, port);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(PreviewError::Io)?;

    axum::serve(listener, app)
        .await
        .map_err(|e| PreviewError::Other(e.to_string()))?;

    Ok(())
}
