//! services/frontend/src/adapters/snapshot_camera.rs
//!
//! A `CameraDevice` backed by HTTP JPEG snapshot endpoints, one per facing mode
//! (e.g. an IP camera or a phone running a webcam app). The stream "tracks" are
//! logical: stopping them makes further frame reads fail.

use async_trait::async_trait;
use leafscan_core::ports::{CameraDevice, MediaStream, PortError, PortResult, StreamConstraints};
use leafscan_core::{CameraError, FacingMode, VideoFrame};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct SnapshotCamera {
    client: reqwest::Client,
    user_url: Option<String>,
    environment_url: Option<String>,
}

impl SnapshotCamera {
    pub fn new(
        user_url: Option<String>,
        environment_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            user_url,
            environment_url,
        })
    }

    fn url_for(&self, facing: FacingMode) -> Option<&str> {
        match facing {
            FacingMode::User => self.user_url.as_deref(),
            FacingMode::Environment => self.environment_url.as_deref(),
        }
    }
}

/// Fetches one snapshot and decodes it to RGBA.
async fn fetch_frame(client: &reqwest::Client, url: &str) -> Result<VideoFrame, CameraError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| CameraError::DeviceUnavailable(e.to_string()))?;

    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(CameraError::PermissionDenied)
        }
        status if !status.is_success() => {
            return Err(CameraError::DeviceUnavailable(format!(
                "snapshot HTTP error: {}",
                status
            )))
        }
        _ => {}
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| CameraError::DeviceUnavailable(e.to_string()))?;

    tokio::task::spawn_blocking(move || -> Result<VideoFrame, CameraError> {
        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| CameraError::DeviceUnavailable(format!("undecodable snapshot: {}", e)))?;
        let rgba = decoded.to_rgba8();
        Ok(VideoFrame {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        })
    })
    .await
    .map_err(|e| CameraError::DeviceUnavailable(e.to_string()))?
}

//=========================================================================================
// `CameraDevice` Trait Implementation
//=========================================================================================

#[async_trait]
impl CameraDevice for SnapshotCamera {
    fn is_supported(&self) -> bool {
        self.user_url.is_some() || self.environment_url.is_some()
    }

    /// Grants a stream once a first snapshot has been read successfully.
    async fn request_stream(
        &self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, CameraError> {
        let facing = constraints.facing_mode;
        let url = self.url_for(facing).ok_or_else(|| {
            CameraError::DeviceUnavailable(format!("no {} camera is configured", facing.as_str()))
        })?;

        let probe = fetch_frame(&self.client, url).await?;
        info!(
            facing = facing.as_str(),
            width = probe.width,
            height = probe.height,
            "Snapshot camera reachable"
        );

        Ok(Box::new(SnapshotStream {
            id: Uuid::new_v4().to_string(),
            client: self.client.clone(),
            url: url.to_string(),
            stopped: false,
        }))
    }
}

//=========================================================================================
// The Stream
//=========================================================================================

struct SnapshotStream {
    id: String,
    client: reqwest::Client,
    url: String,
    stopped: bool,
}

#[async_trait]
impl MediaStream for SnapshotStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn live_tracks(&self) -> usize {
        if self.stopped {
            0
        } else {
            1
        }
    }

    fn stop_tracks(&mut self) {
        if !self.stopped {
            self.stopped = true;
            debug!(stream_id = %self.id, "Snapshot stream stopped");
        }
    }

    async fn read_frame(&self) -> PortResult<VideoFrame> {
        if self.stopped {
            return Err(PortError::Unexpected("stream is stopped".to_string()));
        }
        fetch_frame(&self.client, &self.url)
            .await
            .map_err(|e| PortError::Network(e.to_string()))
    }
}
