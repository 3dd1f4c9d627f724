//! crates/leafscan_core/src/error.rs
//!
//! Error taxonomy for the capture-and-review pipeline.
//!
//! Every failure carries a machine-checkable [`ErrorKind`] next to its
//! human-readable message, so callers can pattern-match instead of parsing text.

use serde::Serialize;

/// The machine-checkable kind of every pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    // --- Validation ---
    TooLarge,
    UnsupportedType,
    // --- Camera ---
    NoMediaSupport,
    PermissionDenied,
    DeviceUnavailable,
    DeviceLost,
    EncodeFailed,
    InvalidState,
    // --- Submission / history ---
    Unauthenticated,
    SessionExpired,
    ServerRejected,
    NetworkFailure,
    SubmissionInFlight,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TooLarge => "too_large",
            ErrorKind::UnsupportedType => "unsupported_type",
            ErrorKind::NoMediaSupport => "no_media_support",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::DeviceUnavailable => "device_unavailable",
            ErrorKind::DeviceLost => "device_lost",
            ErrorKind::EncodeFailed => "encode_failed",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::SessionExpired => "session_expired",
            ErrorKind::ServerRejected => "server_rejected",
            ErrorKind::NetworkFailure => "network_failure",
            ErrorKind::SubmissionInFlight => "submission_in_flight",
        }
    }
}

/// Raised by the image source when a picked file or captured frame breaks the
/// candidate image invariants. Never submitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Image is {size_bytes} bytes; the limit is {limit} bytes (5 MB)")]
    TooLarge { size_bytes: u64, limit: u64 },
    #[error("Unsupported image type '{0}'; only JPEG and PNG are accepted")]
    UnsupportedType(String),
    #[error("Captured frame could not be encoded: {0}")]
    EncodeFailed(String),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::TooLarge { .. } => ErrorKind::TooLarge,
            ValidationError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            ValidationError::EncodeFailed(_) => ErrorKind::EncodeFailed,
        }
    }
}

/// Camera failures. Each one leaves the session `Closed` or `Error`, never half open.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    #[error("This device has no camera/media support")]
    NoMediaSupport,
    #[error("Camera permission was denied")]
    PermissionDenied,
    #[error("Camera could not be started: {0}")]
    DeviceUnavailable(String),
    #[error("Camera device was lost during the session")]
    DeviceLost,
    #[error("Camera command '{command}' is not valid while the session is {state}")]
    InvalidState { command: &'static str, state: String },
    #[error(transparent)]
    Capture(#[from] ValidationError),
}

impl CameraError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CameraError::NoMediaSupport => ErrorKind::NoMediaSupport,
            CameraError::PermissionDenied => ErrorKind::PermissionDenied,
            CameraError::DeviceUnavailable(_) => ErrorKind::DeviceUnavailable,
            CameraError::DeviceLost => ErrorKind::DeviceLost,
            CameraError::InvalidState { .. } => ErrorKind::InvalidState,
            CameraError::Capture(e) => e.kind(),
        }
    }
}

/// Tagged failure of a submission or history load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct DetectionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DetectionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthenticated() -> Self {
        Self::new(ErrorKind::Unauthenticated, "You need to sign in before running a detection")
    }

    pub fn session_expired() -> Self {
        Self::new(ErrorKind::SessionExpired, "Your session has expired, please sign in again")
    }

    pub fn in_flight() -> Self {
        Self::new(
            ErrorKind::SubmissionInFlight,
            "A detection is already being processed",
        )
    }
}

impl From<ValidationError> for DetectionError {
    fn from(e: ValidationError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}
