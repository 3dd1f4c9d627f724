#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use leafscan_core::{
    ApiReply, CameraDevice, CameraError, DetectionApi, FacingMode, ImageUpload, MediaStream,
    PortError, PortResult, SessionToken, StreamConstraints, VideoFrame,
};

//=========================================================================================
// Camera
//=========================================================================================

#[derive(Default)]
pub struct FakeCamera {
    pub deny: bool,
    pub fail_facing: Option<FacingMode>,
    pub live: Arc<AtomicUsize>,
    pub revoked: Arc<AtomicBool>,
    pub requests: Mutex<Vec<StreamConstraints>>,
}

impl FakeCamera {
    pub fn live_tracks(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

struct FakeStream {
    id: String,
    stopped: bool,
    live: Arc<AtomicUsize>,
    revoked: Arc<AtomicBool>,
}

#[async_trait]
impl MediaStream for FakeStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn live_tracks(&self) -> usize {
        if self.stopped || self.revoked.load(Ordering::SeqCst) {
            0
        } else {
            1
        }
    }

    fn stop_tracks(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    async fn read_frame(&self) -> PortResult<VideoFrame> {
        Ok(VideoFrame {
            width: 32,
            height: 24,
            rgba: vec![90u8; 32 * 24 * 4],
        })
    }
}

#[async_trait]
impl CameraDevice for FakeCamera {
    fn is_supported(&self) -> bool {
        true
    }

    async fn request_stream(
        &self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, CameraError> {
        self.requests.lock().unwrap().push(constraints);
        if self.deny {
            return Err(CameraError::PermissionDenied);
        }
        if self.fail_facing == Some(constraints.facing_mode) {
            return Err(CameraError::DeviceUnavailable("device busy".into()));
        }
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            id: format!("fake-{}", constraints.facing_mode.as_str()),
            stopped: false,
            live: self.live.clone(),
            revoked: self.revoked.clone(),
        }))
    }
}

//=========================================================================================
// Backend
//=========================================================================================

pub struct FakeBackend {
    pub upload_status: u16,
    pub upload_body: String,
    pub history_status: u16,
    pub history_body: String,
    pub uploads: AtomicUsize,
    pub last_upload: Mutex<Option<ImageUpload>>,
    pub gate: Option<Arc<Notify>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            upload_status: 200,
            upload_body: detection_body(94.2, "Infected"),
            history_status: 200,
            history_body: r#"{"data": []}"#.to_string(),
            uploads: AtomicUsize::new(0),
            last_upload: Mutex::new(None),
            gate: None,
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DetectionApi for FakeBackend {
    async fn upload_image(
        &self,
        _token: &SessionToken,
        upload: ImageUpload,
    ) -> PortResult<ApiReply> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        *self.last_upload.lock().unwrap() = Some(upload);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(ApiReply {
            status: self.upload_status,
            body: Bytes::from(self.upload_body.clone()),
        })
    }

    async fn fetch_history(&self, _token: &SessionToken) -> PortResult<ApiReply> {
        Ok(ApiReply {
            status: self.history_status,
            body: Bytes::from(self.history_body.clone()),
        })
    }

    async fn fetch_article(&self, _token: &SessionToken, slug: &str) -> PortResult<ApiReply> {
        Err(PortError::NotFound(slug.to_string()))
    }
}

pub fn detection_body(accuracy: f64, status: &str) -> String {
    format!(
        r#"{{"success": true, "message": "Deteksi berhasil",
            "data": {{"id": 42, "imageUrl": "https://cdn.example/leaf-42.jpg", "accuracy": {accuracy},
                      "status": "{status}", "detectedAt": "2026-10-17T03:00:00Z",
                      "disease": {{"name": "Blas Daun", "description": "Bercak belah ketupat",
                                   "solutions": ["Fungisida trisiklazol"]}},
                      "articleSlug": "blas-daun"}}}}"#
    )
}

pub fn token() -> SessionToken {
    SessionToken::new("test-token").unwrap()
}
