//! Error responses for the dashboard API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use motorlink_core::relay::RelayError;
use motorlink_core::upload::UploadError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Relay(e) => match e {
                RelayError::InvalidCommand(_) => (StatusCode::BAD_REQUEST, "INVALID_COMMAND"),
                RelayError::NoTarget => (StatusCode::SERVICE_UNAVAILABLE, "NO_TARGET"),
                RelayError::Unreachable { .. } => (StatusCode::BAD_GATEWAY, "DEVICE_UNREACHABLE"),
                RelayError::Rejected { .. } => (StatusCode::BAD_GATEWAY, "DEVICE_REJECTED"),
                RelayError::Transport { .. } => (StatusCode::BAD_GATEWAY, "DEVICE_ERROR"),
            },
            ApiError::Upload(e) => match e {
                UploadError::EmptySketch => (StatusCode::BAD_REQUEST, "NO_CODE"),
                UploadError::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
                UploadError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "UPLOAD_TIMEOUT"),
                UploadError::Failed { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "UPLOAD_FAILED"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let mut body = json!({
            "success": false,
            "code": code,
            "error": self.to_string(),
        });
        if let ApiError::Upload(e) = &self {
            if let Some(stderr) = e.stderr() {
                body["stderr"] = json!(stderr);
            }
        }
        if let ApiError::Relay(RelayError::Rejected { body: device, .. }) = &self {
            body["details"] = json!(device);
        }

        (status, Json(body)).into_response()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
