//! services/frontend/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser view and this service.

use chrono::{DateTime, Utc};
use leafscan_core::history::HistoryLoad;
use leafscan_core::workspace::SelectionSummary;
use leafscan_core::{
    CameraState, ClassifiedDetection, DetectionError, FacingMode, HistoryRecord, Page,
    TimeWindowFilter, WorkspaceSnapshot,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Body of `POST /workspace/camera/open`. Every field is optional.
#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct OpenCameraRequest {
    /// `user` (front) or `environment` (back, the default).
    #[schema(value_type = Option<String>, example = "environment")]
    pub facing_mode: Option<FacingMode>,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Error payload of every failed request.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct ErrorBody {
    pub error_code: String,
    pub message: String,
}

impl From<&DetectionError> for ErrorBody {
    fn from(e: &DetectionError) -> Self {
        Self {
            error_code: e.kind.as_str().to_string(),
            message: e.message.clone(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct SelectionResponse {
    /// `blob:<uuid>`; the bytes are served by `GET /previews/{id}`.
    pub preview_url: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// `file` or `camera_capture`.
    pub source: String,
}

impl From<SelectionSummary> for SelectionResponse {
    fn from(s: SelectionSummary) -> Self {
        Self {
            preview_url: s.preview_url,
            file_name: s.file_name,
            mime_type: s.mime_type,
            size_bytes: s.size_bytes,
            source: s.source_kind.as_str().to_string(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct DiseaseResponse {
    pub name: String,
    pub description: String,
    pub solutions: Vec<String>,
}

/// A live detection with its severity tier and display labels.
#[derive(Serialize, Debug, ToSchema)]
pub struct DetectionResponse {
    pub id: String,
    pub image_url: String,
    pub accuracy: f64,
    pub status: String,
    pub status_label: String,
    pub tier: String,
    pub tier_label: String,
    pub detected_at: DateTime<Utc>,
    pub disease: Option<DiseaseResponse>,
    pub article_slug: Option<String>,
}

impl From<ClassifiedDetection> for DetectionResponse {
    fn from(d: ClassifiedDetection) -> Self {
        Self {
            id: d.result.id,
            image_url: d.result.image_url,
            accuracy: d.result.accuracy,
            status: d.result.status,
            status_label: d.classification.status_label,
            tier: d.classification.tier.as_str().to_string(),
            tier_label: d.classification.tier_label.to_string(),
            detected_at: d.result.detected_at,
            disease: d.result.disease.map(|disease| DiseaseResponse {
                name: disease.name,
                description: disease.description,
                solutions: disease.solutions,
            }),
            article_slug: d.result.article_slug,
        }
    }
}

/// Everything the detection view renders.
#[derive(Serialize, Debug, ToSchema)]
pub struct WorkspaceResponse {
    /// `closed`, `requesting`, `active` or `error`.
    pub camera_state: String,
    /// The error kind when `camera_state` is `error`.
    pub camera_error_code: Option<String>,
    pub camera_error: Option<String>,
    pub facing_mode: String,
    pub fullscreen: bool,
    pub selection: Option<SelectionResponse>,
    pub submission_pending: bool,
    pub last_result: Option<DetectionResponse>,
    pub last_error: Option<ErrorBody>,
}

fn camera_parts(state: CameraState) -> (String, Option<String>) {
    let (name, code) = match state {
        CameraState::Closed => ("closed", None),
        CameraState::Requesting => ("requesting", None),
        CameraState::Active => ("active", None),
        CameraState::Error(kind) => ("error", Some(kind.as_str().to_string())),
    };
    (name.to_string(), code)
}

impl From<WorkspaceSnapshot> for WorkspaceResponse {
    fn from(s: WorkspaceSnapshot) -> Self {
        let (camera_state, camera_error_code) = camera_parts(s.camera);
        Self {
            camera_state,
            camera_error_code,
            camera_error: s.camera_error,
            facing_mode: s.facing_mode.as_str().to_string(),
            fullscreen: s.fullscreen,
            selection: s.selection.map(SelectionResponse::from),
            submission_pending: s.submission_pending,
            last_result: s.last_result.map(DetectionResponse::from),
            last_error: s.last_error.as_ref().map(ErrorBody::from),
        }
    }
}

/// Lock-free status, answered even while a camera request is in progress.
#[derive(Serialize, Debug, ToSchema)]
pub struct CameraStatusResponse {
    pub camera_state: String,
    pub camera_error_code: Option<String>,
    pub submission_pending: bool,
}

impl CameraStatusResponse {
    pub fn new(state: CameraState, submission_pending: bool) -> Self {
        let (camera_state, camera_error_code) = camera_parts(state);
        Self {
            camera_state,
            camera_error_code,
            submission_pending,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct FullscreenResponse {
    pub fullscreen: bool,
}

/// One row of the history table.
#[derive(Serialize, Debug, ToSchema)]
pub struct HistoryRowResponse {
    pub id: String,
    pub image_url: String,
    /// The "Hasil" column.
    pub result: String,
    pub accuracy: f64,
    pub tier: String,
    pub tier_label: String,
    pub status_label: String,
    pub date: String,
    pub time: String,
    /// RFC 3339 in the history time zone.
    pub detected_at: String,
}

impl From<HistoryRecord> for HistoryRowResponse {
    fn from(r: HistoryRecord) -> Self {
        Self {
            result: r.result_label().to_string(),
            id: r.id,
            image_url: r.image_url,
            accuracy: r.accuracy,
            tier: r.severity_tier.as_str().to_string(),
            tier_label: r.severity_tier.label().to_string(),
            status_label: r.status_label,
            date: r.formatted_date,
            time: r.formatted_time,
            detected_at: r.detected_at.to_rfc3339(),
        }
    }
}

/// One page of the history view.
#[derive(Serialize, Debug, ToSchema)]
pub struct HistoryPageResponse {
    pub items: Vec<HistoryRowResponse>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub window: String,
    /// `remote`, or `fallback` when the backend could not be reached.
    pub source: String,
    /// Why the fallback is shown.
    pub advisory: Option<ErrorBody>,
}

impl HistoryPageResponse {
    pub fn new(page: Page<HistoryRecord>, window: TimeWindowFilter, load: &HistoryLoad) -> Self {
        Self {
            items: page.items.into_iter().map(HistoryRowResponse::from).collect(),
            page: page.page,
            total_pages: page.total_pages,
            total_items: page.total_items,
            window: window.as_str().to_string(),
            source: load.source.as_str().to_string(),
            advisory: load.advisory.as_ref().map(ErrorBody::from),
        }
    }
}
