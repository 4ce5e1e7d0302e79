use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::parse_video_id;
use crate::services::playback::resolve_playback;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tubely_core::models::VideoResponse;
use tubely_core::AppError;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/videos/{videoID}",
    tag = "videos",
    params(
        ("videoID" = Uuid, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Video found; video_url is freshly signed", body = VideoResponse),
        (status = 400, description = "Invalid ID", body = ErrorResponse),
        (status = 401, description = "Missing or invalid JWT", body = ErrorResponse),
        (status = 403, description = "Caller does not own the video", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state),
    fields(
        user_id = %owner.user_id,
        operation = "get_video"
    )
)]
pub async fn get_video(
    owner: OwnerContext,
    Path(video_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video_id = parse_video_id(&video_id)?;

    let video = state
        .videos
        .get(video_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Couldn't find video".to_string()))?;

    if !video.is_owned_by(owner.user_id) {
        return Err(AppError::Forbidden("Not authorized to view this video".to_string()).into());
    }

    let response = resolve_playback(
        state.media.storage.as_ref(),
        video,
        state.media.limits.signed_url_ttl,
    )
    .await?;

    Ok(Json(response))
}
