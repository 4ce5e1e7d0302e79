use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::parse_video_id;
use crate::services::upload::VideoUploadService;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tubely_core::models::VideoResponse;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/videos/{videoID}",
    tag = "videos",
    params(
        ("videoID" = Uuid, Path, description = "Video ID")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Video uploaded; video_url is a signed playback URL", body = VideoResponse),
        (status = 400, description = "Invalid ID, media type or size", body = ErrorResponse),
        (status = 401, description = "Missing or invalid JWT", body = ErrorResponse),
        (status = 403, description = "Caller does not own the video", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 500, description = "Processing or storage failure", body = ErrorResponse),
        (status = 504, description = "Processing or storage timed out", body = ErrorResponse)
    )
)]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
    Path(video_id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let video_id = parse_video_id(&video_id)?;

    tracing::info!(video_id = %video_id, user_id = %owner.user_id, "Uploading video");

    let response = VideoUploadService::new(&state)
        .upload(owner.user_id, video_id, multipart)
        .await?;

    Ok(Json(response))
}
