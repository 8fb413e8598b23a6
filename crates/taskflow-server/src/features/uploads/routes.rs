//! Upload API routes
//!
//! - `POST /api/v1/uploads` - multipart form with a `file` field holding a
//!   JSON array of task records. Answers `202 Accepted` once the file is
//!   stored; ingestion outcomes go to the ingestion log, never to the caller.

use crate::api::response::{ApiResponse, ErrorResponse};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use super::commands::{UploadBatchCommand, UploadBatchError};
use super::UploadState;

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 16 * 1024;

pub fn uploads_routes(max_upload_bytes: usize) -> Router<UploadState> {
    Router::new()
        .route("/", post(upload_batch))
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
        ))
}

#[tracing::instrument(skip(state, multipart))]
async fn upload_batch(
    State(state): State<UploadState>,
    mut multipart: Multipart,
) -> Result<Response, UploadApiError> {
    let mut command = UploadBatchCommand {
        max_bytes: state.max_upload_bytes,
        ..Default::default()
    };

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            command.original_name = field.file_name().map(str::to_string);
            command.content = field.bytes().await?.to_vec();
        }
    }

    let response = super::commands::upload::handle(state, command).await?;

    tracing::info!(
        file_name = %response.file_name,
        size = response.size,
        queued = response.queued,
        "Batch upload accepted"
    );

    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(response))).into_response())
}

#[derive(Debug)]
enum UploadApiError {
    Multipart(MultipartError),
    Upload(UploadBatchError),
}

impl From<MultipartError> for UploadApiError {
    fn from(err: MultipartError) -> Self {
        Self::Multipart(err)
    }
}

impl From<UploadBatchError> for UploadApiError {
    fn from(err: UploadBatchError) -> Self {
        Self::Upload(err)
    }
}

impl IntoResponse for UploadApiError {
    fn into_response(self) -> Response {
        match self {
            UploadApiError::Multipart(ref err) => {
                let status = err.status();
                let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    "PAYLOAD_TOO_LARGE"
                } else {
                    "VALIDATION_ERROR"
                };
                let error = ErrorResponse::new(code, err.body_text());
                (status, Json(error)).into_response()
            },
            UploadApiError::Upload(UploadBatchError::ContentRequired) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            UploadApiError::Upload(UploadBatchError::TooLarge { .. }) => {
                let error = ErrorResponse::new("PAYLOAD_TOO_LARGE", self.to_string());
                (StatusCode::PAYLOAD_TOO_LARGE, Json(error)).into_response()
            },
            UploadApiError::Upload(UploadBatchError::Storage(_)) => {
                tracing::error!("Storage error during batch upload: {}", self);
                let error = ErrorResponse::new("STORAGE_ERROR", "A storage error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for UploadApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Multipart(e) => write!(f, "{}", e),
            Self::Upload(e) => write!(f, "{}", e),
        }
    }
}
