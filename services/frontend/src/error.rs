//! services/frontend/src/error.rs
//!
//! Defines the primary error type for the frontend service and the error
//! returned by its HTTP handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use leafscan_core::{CameraError, DetectionError, ErrorKind, ValidationError};

use crate::config::ConfigError;
use crate::web::protocol::ErrorBody;

/// The primary error type for the `frontend` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error building or using the outbound HTTP client.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// An error answered to a view request as `{ error_code, message }`.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
}

/// HTTP status for each pipeline error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::TooLarge | ErrorKind::UnsupportedType | ErrorKind::EncodeFailed => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::Unauthenticated | ErrorKind::SessionExpired => StatusCode::UNAUTHORIZED,
        ErrorKind::SubmissionInFlight | ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::NoMediaSupport
        | ErrorKind::PermissionDenied
        | ErrorKind::DeviceUnavailable
        | ErrorKind::DeviceLost => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ServerRejected => StatusCode::BAD_GATEWAY,
        ErrorKind::NetworkFailure => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl ViewError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ViewError::Detection(e) => (status_for(e.kind), e.kind.as_str()),
            ViewError::Validation(e) => (status_for(e.kind()), e.kind().as_str()),
            ViewError::Camera(e) => (status_for(e.kind()), e.kind().as_str()),
            ViewError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ViewError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        }
    }
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, error_code, message = %message, "Request error");
        } else {
            tracing::info!(status = %status, error_code, message = %message, "Request refused");
        }

        let body = ErrorBody {
            error_code: error_code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(status_for(ErrorKind::TooLarge), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::SessionExpired), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(ErrorKind::SubmissionInFlight), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::PermissionDenied), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(ErrorKind::ServerRejected), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ErrorKind::NetworkFailure), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn startup_failures_convert_into_api_error() {
        let err: ApiError = ConfigError::MissingVar("API_BASE_URL".into()).into();
        assert!(matches!(err, ApiError::Config(_)));
        assert!(err.to_string().contains("API_BASE_URL"));

        let err: ApiError = std::io::Error::new(std::io::ErrorKind::AddrInUse, "busy").into();
        assert!(matches!(err, ApiError::Io(_)));
    }

    #[test]
    fn camera_error_uses_its_kind_code() {
        let response = ViewError::from(CameraError::PermissionDenied).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let (_, code) = ViewError::from(CameraError::Capture(ValidationError::EncodeFailed(
            "bad frame".into(),
        )))
        .parts();
        assert_eq!(code, "encode_failed");
    }
}
