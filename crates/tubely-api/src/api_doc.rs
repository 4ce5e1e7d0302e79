//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use tubely_core::models;

/// Returns the OpenAPI document served at `/api/openapi.json`.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tubely API",
        version = "0.1.0",
        description = "Video upload pipeline. Uploads are remuxed for progressive playback, stored under an aspect-ratio partitioned key, and returned with a short-lived signed URL. Video endpoints require `Authorization: Bearer <jwt>`."
    ),
    paths(
        handlers::video_upload::upload_video,
        handlers::video_get::get_video,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::VideoResponse,
            models::Classification,
            handlers::health::HealthResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "videos", description = "Video upload and playback URL operations"),
        (name = "health", description = "Service health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_video_routes() {
        let spec = get_openapi_spec();
        assert!(spec.paths.paths.contains_key("/api/videos/{videoID}"));
        assert!(spec.paths.paths.contains_key("/health"));
    }
}
