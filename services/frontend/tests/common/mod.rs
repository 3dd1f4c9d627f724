#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    extract::{Multipart, Path},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use frontend_lib::adapters::HttpDetectionApi;
use frontend_lib::config::Config;
use frontend_lib::web::{router, AppState};
use leafscan_core::ports::{CameraDevice, MediaStream, PortResult, StreamConstraints};
use leafscan_core::{CameraError, VideoFrame};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const GOOD_TOKEN: &str = "good-token";

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

//=========================================================================================
// Fake detection backend
//=========================================================================================

fn authorized(headers: &HeaderMap) -> bool {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {}", GOOD_TOKEN).as_str())
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({"message": "Unauthorized"})))
}

/// Echoes what it received in `imageUrl` as `<field>/<file name>/<content type>/<len>`.
async fn detections(headers: HeaderMap, mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    let Ok(Some(field)) = multipart.next_field().await else {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "no file"})));
    };
    let name = field.name().unwrap_or_default().to_string();
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().unwrap_or_default().to_string();
    let len = field.bytes().await.map(|b| b.len()).unwrap_or_default();

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Deteksi berhasil",
            "data": {
                "id": 7,
                "imageUrl": format!("{}/{}/{}/{}", name, file_name, content_type, len),
                "accuracy": "94.2%",
                "status": "Infected",
                "detectedAt": "2026-10-17T03:00:00Z",
                "disease": {"name": "Blas Daun", "description": "Bercak", "solutions": ["Fungisida"]},
                "articleSlug": "blas-daun"
            }
        })),
    )
}

async fn history(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": [
                {"id": 1, "image_url": "a.jpg", "accuracy": 72.5, "status": "Terdeteksi Penyakit",
                 "detected_at": "2026-10-01T01:00:00Z", "disease": "Tungro"},
                {"id": 2, "imageUrl": "b.jpg", "accuracy": 91, "status": "Infected",
                 "detectedAt": "2026-10-16T01:00:00Z", "disease": {"name": "Blas Daun"}}
            ]
        })),
    )
}

async fn article(headers: HeaderMap, Path(slug): Path<String>) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    (StatusCode::OK, Json(json!({"slug": slug, "title": "Penyakit Blas"})))
}

pub async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/detections", post(detections))
        .route("/detections/history", get(history))
        .route("/articles/{slug}", get(article));
    serve(app).await
}

//=========================================================================================
// Fake camera
//=========================================================================================

/// A camera whose device can be pulled while a stream is live.
#[derive(Clone, Default)]
pub struct FakeCamera {
    revoked: Arc<AtomicBool>,
}

impl FakeCamera {
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }
}

struct FakeStream {
    stopped: bool,
    revoked: Arc<AtomicBool>,
}

#[async_trait]
impl MediaStream for FakeStream {
    fn id(&self) -> &str {
        "fake-stream"
    }

    fn live_tracks(&self) -> usize {
        usize::from(!self.stopped && !self.revoked.load(Ordering::SeqCst))
    }

    fn stop_tracks(&mut self) {
        self.stopped = true;
    }

    async fn read_frame(&self) -> PortResult<VideoFrame> {
        Ok(VideoFrame {
            width: 40,
            height: 30,
            rgba: vec![120u8; 40 * 30 * 4],
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
        _constraints: StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, CameraError> {
        Ok(Box::new(FakeStream {
            stopped: false,
            revoked: self.revoked.clone(),
        }))
    }
}

//=========================================================================================
// The service under test
//=========================================================================================

pub fn config(api_base_url: &str) -> Config {
    let vars = HashMap::from([
        ("API_BASE_URL".to_string(), api_base_url.to_string()),
        ("REQUEST_TIMEOUT_SECS".to_string(), "5".to_string()),
    ]);
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

/// Starts the view service against a fresh fake backend.
pub async fn spawn_frontend() -> (String, Arc<AppState>) {
    spawn_frontend_with(FakeCamera::default()).await
}

pub async fn spawn_frontend_with(camera: FakeCamera) -> (String, Arc<AppState>) {
    let backend = spawn_backend().await;
    let config = Arc::new(config(&backend));
    let api =
        Arc::new(HttpDetectionApi::new(&config.api_base_url, Duration::from_secs(5)).unwrap());
    let app_state = Arc::new(AppState::new(config, api, Arc::new(camera)));
    let base = serve(router(app_state.clone())).await;
    (base, app_state)
}
