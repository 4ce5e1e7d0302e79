//! Serves objects of the local storage backend behind signed URLs.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tubely_core::AppError;

#[derive(Debug, Deserialize)]
pub struct SignatureQuery {
    pub expires: Option<i64>,
    pub signature: Option<String>,
}

fn content_type_for(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext) {
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// Stream a locally stored object while its signature is valid.
pub async fn serve_media(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<SignatureQuery>,
) -> Result<Response, HttpAppError> {
    let local = state
        .media
        .local_storage
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;

    let (Some(expires), Some(signature)) = (query.expires, query.signature) else {
        return Err(AppError::Forbidden("Missing signature".to_string()).into());
    };

    if !local.verify(&key, expires, &signature, Utc::now()) {
        tracing::debug!(key = %key, expires, "Rejected media request");
        return Err(AppError::Forbidden("Invalid or expired signature".to_string()).into());
    }

    let (size, stream) = local.open_stream(&key).await?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&key).to_string()),
            (header::CONTENT_LENGTH, size.to_string()),
            (header::CACHE_CONTROL, "private, no-store".to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
