//! services/frontend/src/web/rest.rs
//!
//! Contains the Axum handlers for the detection view and the master
//! definition for the OpenAPI specification.

use crate::error::ViewError;
use crate::web::middleware::SessionContext;
use crate::web::protocol::{
    CameraStatusResponse, DetectionResponse, DiseaseResponse, ErrorBody, FullscreenResponse,
    HistoryPageResponse, HistoryRowResponse, OpenCameraRequest, SelectionResponse,
    WorkspaceResponse,
};
use crate::web::state::AppState;
use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Json},
    Extension,
};
use leafscan_core::submission::IMAGE_FIELD;
use leafscan_core::workspace::submit_selection;
use leafscan_core::{DetectionWorkspace, PickedFile};
use std::sync::Arc;
use tracing::{debug, info};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_workspace_handler,
        camera_status_handler,
        upload_file_handler,
        clear_selection_handler,
        open_camera_handler,
        switch_camera_handler,
        capture_handler,
        close_camera_handler,
        fullscreen_handler,
        acknowledge_camera_error_handler,
        submit_handler,
        preview_handler,
        article_handler,
        crate::web::history::get_history_handler,
        crate::web::history::export_history_handler,
    ),
    components(
        schemas(
            WorkspaceResponse, CameraStatusResponse, SelectionResponse, DetectionResponse,
            DiseaseResponse, ErrorBody, OpenCameraRequest, FullscreenResponse,
            HistoryPageResponse, HistoryRowResponse,
        )
    ),
    tags(
        (name = "Leaf Scan", description = "Rice-leaf disease detection: capture, submit and review.")
    )
)]
pub struct ApiDoc;

/// Renders the workspace together with the coordinator's pending flag.
fn render(app_state: &AppState, workspace: &DetectionWorkspace) -> Json<WorkspaceResponse> {
    Json(workspace.snapshot(app_state.coordinator.is_pending()).into())
}

//=========================================================================================
// Workspace
//=========================================================================================

/// Current state of the detection view.
///
/// Also checks whether an active camera is still delivering frames.
#[utoipa::path(
    get,
    path = "/workspace",
    responses((status = 200, description = "Workspace state", body = WorkspaceResponse))
)]
pub async fn get_workspace_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<WorkspaceResponse> {
    let mut workspace = app_state.workspace.lock().await;
    if let Err(e) = workspace.check_camera() {
        debug!(error = %e, "Camera lost since the last poll");
    }
    render(&app_state, &workspace)
}

/// Camera state and the pending-submission flag, without waiting on the workspace.
#[utoipa::path(
    get,
    path = "/workspace/camera",
    responses((status = 200, description = "Camera status", body = CameraStatusResponse))
)]
pub async fn camera_status_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<CameraStatusResponse> {
    let state = *app_state.camera_state.borrow();
    Json(CameraStatusResponse::new(state, app_state.coordinator.is_pending()))
}

/// Select an image file (picker or drag-and-drop).
///
/// Accepts a multipart/form-data request with an `image` file part. JPEG and PNG
/// up to 5 MB are accepted; a rejected file keeps the previous selection.
#[utoipa::path(
    post,
    path = "/workspace/file",
    request_body(content_type = "multipart/form-data", description = "The image to select, in the `image` field."),
    responses(
        (status = 200, description = "Image selected", body = WorkspaceResponse),
        (status = 400, description = "No file in the form", body = ErrorBody),
        (status = 422, description = "Too large or unsupported type", body = ErrorBody)
    )
)]
pub async fn upload_file_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<WorkspaceResponse>, ViewError> {
    let mut picked = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ViewError::BadRequest(format!("Failed to read multipart data: {}", e)))?
    {
        if field.name() != Some(IMAGE_FIELD) && field.file_name().is_none() {
            continue;
        }
        let name = field.file_name().unwrap_or("image").to_string();
        let mime_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ViewError::BadRequest(format!("Failed to read file bytes: {}", e)))?;
        picked = Some(PickedFile {
            name,
            mime_type,
            bytes,
        });
        break;
    }
    let file = picked.ok_or_else(|| {
        ViewError::BadRequest("Multipart form must include an 'image' file".to_string())
    })?;

    let mut workspace = app_state.workspace.lock().await;
    workspace.select_file(file)?;
    Ok(render(&app_state, &workspace))
}

/// Clear the current selection and release its preview.
#[utoipa::path(
    delete,
    path = "/workspace/selection",
    responses((status = 200, description = "Selection cleared", body = WorkspaceResponse))
)]
pub async fn clear_selection_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<WorkspaceResponse> {
    let mut workspace = app_state.workspace.lock().await;
    workspace.clear_selection();
    render(&app_state, &workspace)
}

//=========================================================================================
// Camera
//=========================================================================================

/// Open the camera, by default facing the environment.
#[utoipa::path(
    post,
    path = "/workspace/camera/open",
    request_body(content = OpenCameraRequest, description = "Optional facing mode."),
    responses(
        (status = 200, description = "Camera active", body = WorkspaceResponse),
        (status = 400, description = "Malformed body", body = ErrorBody),
        (status = 503, description = "No camera support, permission denied or device unavailable", body = ErrorBody)
    )
)]
pub async fn open_camera_handler(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<WorkspaceResponse>, ViewError> {
    let request: OpenCameraRequest = if body.iter().all(u8::is_ascii_whitespace) {
        OpenCameraRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ViewError::BadRequest(format!("Invalid camera request: {}", e)))?
    };

    let mut workspace = app_state.workspace.lock().await;
    workspace
        .open_camera(request.facing_mode.unwrap_or_default())
        .await?;
    Ok(render(&app_state, &workspace))
}

/// Switch between the front and back camera.
#[utoipa::path(
    post,
    path = "/workspace/camera/switch",
    responses(
        (status = 200, description = "Camera switched", body = WorkspaceResponse),
        (status = 409, description = "Camera is not active", body = ErrorBody),
        (status = 503, description = "The other camera could not be started", body = ErrorBody)
    )
)]
pub async fn switch_camera_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<WorkspaceResponse>, ViewError> {
    let mut workspace = app_state.workspace.lock().await;
    workspace.switch_camera().await?;
    Ok(render(&app_state, &workspace))
}

/// Capture the current frame as the selection. The camera closes afterwards.
#[utoipa::path(
    post,
    path = "/workspace/camera/capture",
    responses(
        (status = 200, description = "Frame captured", body = WorkspaceResponse),
        (status = 409, description = "Camera is not active", body = ErrorBody),
        (status = 422, description = "The frame could not be encoded", body = ErrorBody)
    )
)]
pub async fn capture_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<WorkspaceResponse>, ViewError> {
    let mut workspace = app_state.workspace.lock().await;
    workspace.capture().await?;
    Ok(render(&app_state, &workspace))
}

/// Close the camera. Safe to call in any state.
#[utoipa::path(
    post,
    path = "/workspace/camera/close",
    responses((status = 200, description = "Camera closed", body = WorkspaceResponse))
)]
pub async fn close_camera_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<WorkspaceResponse> {
    let mut workspace = app_state.workspace.lock().await;
    workspace.close_camera();
    render(&app_state, &workspace)
}

/// Toggle fullscreen presentation of the camera preview.
#[utoipa::path(
    post,
    path = "/workspace/camera/fullscreen",
    responses((status = 200, description = "New fullscreen flag", body = FullscreenResponse))
)]
pub async fn fullscreen_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<FullscreenResponse> {
    let fullscreen = app_state.workspace.lock().await.toggle_fullscreen();
    Json(FullscreenResponse { fullscreen })
}

/// Dismiss a camera error, returning the camera to closed.
#[utoipa::path(
    post,
    path = "/workspace/camera/acknowledge",
    responses((status = 200, description = "Error dismissed", body = WorkspaceResponse))
)]
pub async fn acknowledge_camera_error_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<WorkspaceResponse> {
    let mut workspace = app_state.workspace.lock().await;
    workspace.acknowledge_camera_error();
    render(&app_state, &workspace)
}

//=========================================================================================
// Submission
//=========================================================================================

/// Submit the selected image for detection.
///
/// Requires `Authorization: Bearer <token>`; without it the backend is never contacted.
#[utoipa::path(
    post,
    path = "/workspace/submit",
    responses(
        (status = 200, description = "Classified detection", body = DetectionResponse),
        (status = 401, description = "Not signed in, or the session expired", body = ErrorBody),
        (status = 409, description = "No selection, or a submission is already pending", body = ErrorBody),
        (status = 502, description = "The backend rejected the image", body = ErrorBody),
        (status = 504, description = "The backend could not be reached", body = ErrorBody)
    )
)]
pub async fn submit_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<DetectionResponse>, ViewError> {
    let detection =
        submit_selection(&app_state.workspace, &app_state.coordinator, session.token()).await?;
    info!(
        detection_id = %detection.result.id,
        tier = detection.classification.tier_label,
        "Detection classified"
    );
    Ok(Json(detection.into()))
}

//=========================================================================================
// Previews and Articles
//=========================================================================================

/// Bytes behind a live preview URL. Revoked previews are gone.
#[utoipa::path(
    get,
    path = "/previews/{id}",
    params(("id" = String, Path, description = "Preview id, with or without the `blob:` prefix.")),
    responses(
        (status = 200, description = "The image bytes"),
        (status = 404, description = "Unknown or revoked preview", body = ErrorBody)
    )
)]
pub async fn preview_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ViewError> {
    let (mime_type, bytes) = app_state
        .previews
        .resolve(&id)
        .ok_or_else(|| ViewError::NotFound(format!("Preview '{}' is not available", id)))?;
    Ok((
        [
            (header::CONTENT_TYPE, mime_type),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        bytes,
    ))
}

/// The "learn more" article for a detected disease, passed through from the backend.
#[utoipa::path(
    get,
    path = "/articles/{slug}",
    params(("slug" = String, Path, description = "Article slug from a detection result.")),
    responses(
        (status = 200, description = "The article as returned by the backend"),
        (status = 400, description = "Malformed slug", body = ErrorBody),
        (status = 401, description = "Not signed in, or the session expired", body = ErrorBody)
    )
)]
pub async fn article_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, ViewError> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ViewError::BadRequest(format!("'{}' is not an article slug", slug)));
    }
    let article = app_state.coordinator.article(&slug, session.token()).await?;
    Ok(Json(article))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_doc_lists_every_view_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/workspace",
            "/workspace/camera",
            "/workspace/file",
            "/workspace/selection",
            "/workspace/camera/open",
            "/workspace/camera/switch",
            "/workspace/camera/capture",
            "/workspace/camera/close",
            "/workspace/camera/fullscreen",
            "/workspace/camera/acknowledge",
            "/workspace/submit",
            "/previews/{id}",
            "/articles/{slug}",
            "/history",
            "/history/export",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        let json = doc.to_json().unwrap();
        assert!(json.contains("CameraStatusResponse"));
    }
}
