use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failures of the HTTP surface, rendered as `{"error": ...}` JSON bodies.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("No video file provided")]
    MissingVideo,

    #[error("No file selected")]
    NoFileSelected,

    #[error("Only MP4 files are allowed")]
    UnsupportedFormat,

    #[error("{}", .0.body_text())]
    Upload(#[from] MultipartError),

    #[error("Analysis failed: could not store upload: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Analysis failed: {0}")]
    Analysis(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingVideo | ApiError::NoFileSelected | ApiError::UnsupportedFormat => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Upload(e) => e.status(),
            ApiError::Storage(_) | ApiError::Analysis(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        let body = if status.is_server_error() {
            json!({ "error": message, "success": false })
        } else {
            json!({ "error": message })
        };
        (status, Json(body)).into_response()
    }
}
