//! Route configuration and setup

use crate::api_doc;
use crate::auth::middleware::auth_middleware;
use crate::constants::{API_PREFIX, MULTIPART_OVERHEAD_BYTES};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tubely_core::Config;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    // Every upload holds a scratch file and spawns ffprobe/ffmpeg, so bound in-flight requests
    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(256)
        .max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    Ok(api_router(state)
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(cors))
}

/// Routes, auth, body limit and tracing, without CORS.
pub fn api_router(state: Arc<AppState>) -> Router {
    // Coarse transport ceiling; the exact limit is enforced while buffering
    let body_limit = state
        .media
        .limits
        .max_video_size_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    let protected = Router::new()
        .route(
            &format!("{}/videos/{{video_id}}", API_PREFIX),
            get(handlers::video_get::get_video).post(handlers::video_upload::upload_video),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.security.jwt.clone(),
            auth_middleware,
        ));

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            &format!("{}/openapi.json", API_PREFIX),
            get(|| async { Json(api_doc::get_openapi_spec()) }),
        )
        .merge(protected);

    #[cfg(feature = "storage-local")]
    let app = app.route(
        &format!("{}/{{*key}}", crate::constants::MEDIA_PREFIX),
        get(handlers::local_media::serve_media),
    );

    app.merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}
