//! crates/leafscan_core/src/ports.rs
//!
//! Defines the service contracts (traits) the pipeline depends on.
//! These traits form the boundary of the hexagonal architecture: the camera
//! hardware and the detection backend are reached only through them, so the
//! core can be exercised with fakes that never touch a device or the network.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{FacingMode, SessionToken, VideoFrame};
use crate::error::CameraError;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., network, devices).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Network failure: {0}")]
    Network(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Camera Ports
//=========================================================================================

/// Ideal stream parameters. Video only; audio is never requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub facing_mode: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl StreamConstraints {
    pub fn video(facing_mode: FacingMode) -> Self {
        Self {
            facing_mode,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

/// A granted device stream. Owned exclusively by the camera session.
#[async_trait]
pub trait MediaStream: Send + Sync {
    fn id(&self) -> &str;

    /// Number of tracks still reported as live.
    fn live_tracks(&self) -> usize;

    /// Stops every track. Must be synchronous and idempotent.
    fn stop_tracks(&mut self);

    /// Reads the frame currently shown by the stream, at native resolution.
    async fn read_frame(&self) -> PortResult<VideoFrame>;
}

/// The camera capability of the host.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// `false` when the host has no media capture support at all.
    fn is_supported(&self) -> bool;

    /// Requests a video stream matching the constraints.
    async fn request_stream(
        &self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, CameraError>;
}

//=========================================================================================
// Detection Backend Port
//=========================================================================================

/// A multipart upload with a single file field.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub field: &'static str,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

/// A raw HTTP reply. Status handling is the caller's job.
#[derive(Debug, Clone)]
pub struct ApiReply {
    pub status: u16,
    pub body: Bytes,
}

impl ApiReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The REST endpoints of the detection backend. Transport failures are `PortError`s;
/// any HTTP status, including errors, comes back as an `ApiReply`.
#[async_trait]
pub trait DetectionApi: Send + Sync {
    /// `POST /detections`
    async fn upload_image(&self, token: &SessionToken, upload: ImageUpload) -> PortResult<ApiReply>;

    /// `GET /detections/history`
    async fn fetch_history(&self, token: &SessionToken) -> PortResult<ApiReply>;

    /// `GET /articles/{slug}`
    async fn fetch_article(&self, token: &SessionToken, slug: &str) -> PortResult<ApiReply>;
}
