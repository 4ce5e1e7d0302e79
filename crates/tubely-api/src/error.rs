//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Domain errors from the storage
//! and processing crates convert into `HttpAppError` through `AppError`, so every failure
//! renders as one JSON object with a consistent status, body and log level.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tubely_core::{AppError, ErrorMetadata, LogLevel};
use tubely_processing::ProcessingError;
use tubely_storage::StorageError;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Client-facing description of the failure
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from tubely-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl ErrorResponse {
    fn from_app_error(app_error: &AppError, with_details: bool) -> Self {
        let (details, error_type) = if with_details {
            (
                Some(app_error.detailed_message()),
                Some(app_error.error_type().to_string()),
            )
        } else {
            (None, None)
        };

        ErrorResponse {
            message: app_error.client_message(),
            details,
            error_type,
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Details only leave the process outside production and for non-sensitive errors
        let with_details = !is_production_env() && !app_error.is_sensitive();
        let body = ErrorResponse::from_app_error(app_error, with_details);

        (status, Json(body)).into_response()
    }
}

// Convert domain errors to HttpAppError (avoids orphan rule: we impl for local HttpAppError)

/// Map a storage failure onto `AppError`. The services speak `AppError`, handlers
/// get the same mapping through `From<StorageError> for HttpAppError`.
pub fn storage_error(err: StorageError) -> AppError {
    match err {
        StorageError::NotFound(msg) => AppError::NotFound(msg),
        StorageError::UploadFailed(msg) => AppError::StoreFailed(msg),
        StorageError::SignFailed(msg) => AppError::SignFailed(msg),
        StorageError::DeleteFailed(msg) => AppError::Storage(msg),
        StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
        StorageError::BackendError(msg) => AppError::Storage(msg),
        StorageError::IoError(err) => AppError::Internal(format!("IO error: {}", err)),
        StorageError::ConfigError(msg) => AppError::Internal(msg),
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(storage_error(err))
    }
}

/// Map a processing failure onto `AppError`. `stage` is the pipeline step that failed and
/// picks the variant for tool failures (`ProbeFailed` vs `NormalizeFailed`).
pub fn processing_error(stage: PipelineStage, err: ProcessingError) -> AppError {
    match err {
        ProcessingError::TooLarge { limit_bytes } => AppError::InvalidInput(format!(
            "Video exceeds the maximum upload size of {} bytes",
            limit_bytes
        )),
        ProcessingError::Timeout { tool, timeout } => AppError::Timeout {
            operation: tool,
            seconds: timeout.as_secs(),
        },
        other => match stage {
            PipelineStage::Buffer => AppError::Internal(other.to_string()),
            PipelineStage::Probe => AppError::ProbeFailed(other.to_string()),
            PipelineStage::Normalize => AppError::NormalizeFailed(other.to_string()),
        },
    }
}

/// Local-file stages whose failures come from `tubely-processing`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Buffer,
    Probe,
    Normalize,
}

impl From<ProcessingError> for HttpAppError {
    fn from(err: ProcessingError) -> Self {
        HttpAppError(processing_error(PipelineStage::Buffer, err))
    }
}

/// Multipart read failures. A body that crosses the transport limit surfaces here with
/// status 413 and is reported like any other oversize upload.
pub fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::InvalidInput("Video exceeds the maximum upload size".to_string())
    } else {
        AppError::InvalidInput(format!("Unable to parse form: {}", err.body_text()))
    }
}

impl From<MultipartError> for HttpAppError {
    fn from(err: MultipartError) -> Self {
        HttpAppError(multipart_error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_from_storage_error_not_found() {
        let storage_err = StorageError::NotFound("File not found".to_string());
        let HttpAppError(app_err) = storage_err.into();
        match app_err {
            AppError::NotFound(msg) => assert_eq!(msg, "File not found"),
            _ => panic!("Expected NotFound variant"),
        }
    }

    #[test]
    fn test_from_storage_error_upload_failed() {
        let app_err = storage_error(StorageError::UploadFailed("reset".to_string()));
        assert!(matches!(app_err, AppError::StoreFailed(ref msg) if msg == "reset"));
        assert_eq!(app_err.http_status_code(), 500);
    }

    #[test]
    fn test_from_storage_error_sign_failed() {
        let app_err = storage_error(StorageError::SignFailed("no credentials".to_string()));
        assert!(matches!(app_err, AppError::SignFailed(_)));
    }

    #[test]
    fn test_from_storage_error_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "IO error");
        let HttpAppError(app_err) = StorageError::IoError(io_err).into();
        match app_err {
            AppError::Internal(msg) => assert!(msg.contains("IO error")),
            _ => panic!("Expected Internal variant"),
        }
    }

    #[test]
    fn test_processing_error_by_stage() {
        let failed = || ProcessingError::ToolFailed {
            tool: "ffprobe",
            status: Some(1),
            stderr: "moov atom not found".to_string(),
        };
        assert!(matches!(
            processing_error(PipelineStage::Probe, failed()),
            AppError::ProbeFailed(_)
        ));
        assert!(matches!(
            processing_error(PipelineStage::Normalize, failed()),
            AppError::NormalizeFailed(_)
        ));
    }

    #[test]
    fn test_processing_timeout_and_oversize() {
        let timeout = processing_error(
            PipelineStage::Normalize,
            ProcessingError::Timeout {
                tool: "ffmpeg",
                timeout: Duration::from_secs(300),
            },
        );
        assert_eq!(timeout.http_status_code(), 504);
        assert_eq!(timeout.to_string(), "ffmpeg timed out after 300s");

        let too_large = processing_error(
            PipelineStage::Buffer,
            ProcessingError::TooLarge { limit_bytes: 10 },
        );
        assert_eq!(too_large.http_status_code(), 400);
        assert!(too_large.client_message().contains("10 bytes"));
    }

    #[test]
    fn test_error_response_shape() {
        let err = AppError::Forbidden("Couldn't verify video owner".to_string());
        let json = serde_json::to_value(ErrorResponse::from_app_error(&err, false)).unwrap();
        assert_eq!(json["message"], "Couldn't verify video owner");
        assert_eq!(json["code"], "FORBIDDEN");
        assert_eq!(json["recoverable"], false);
        assert!(json.get("details").is_none());
        assert!(json.get("error_type").is_none());
    }

    #[test]
    fn test_error_response_with_details() {
        let err = AppError::InvalidInput("Invalid ID".to_string());
        let json = serde_json::to_value(ErrorResponse::from_app_error(&err, true)).unwrap();
        assert_eq!(json["error_type"], "InvalidInput");
        assert!(json["details"].as_str().unwrap().contains("Invalid ID"));
    }
}
