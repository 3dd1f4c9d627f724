pub mod history;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

pub use middleware::session_context;
pub use state::AppState;

/// Uploads above the 5 MB image limit must still reach validation, so the body
/// limit sits well above it.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Builds the view routes. CORS and the Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/workspace", get(rest::get_workspace_handler))
        .route("/workspace/camera", get(rest::camera_status_handler))
        .route("/workspace/file", post(rest::upload_file_handler))
        .route("/workspace/selection", delete(rest::clear_selection_handler))
        .route("/workspace/camera/open", post(rest::open_camera_handler))
        .route("/workspace/camera/switch", post(rest::switch_camera_handler))
        .route("/workspace/camera/capture", post(rest::capture_handler))
        .route("/workspace/camera/close", post(rest::close_camera_handler))
        .route("/workspace/camera/fullscreen", post(rest::fullscreen_handler))
        .route(
            "/workspace/camera/acknowledge",
            post(rest::acknowledge_camera_error_handler),
        )
        .route("/workspace/submit", post(rest::submit_handler))
        .route("/previews/{id}", get(rest::preview_handler))
        .route("/articles/{slug}", get(rest::article_handler))
        .route("/history", get(history::get_history_handler))
        .route("/history/export", get(history::export_history_handler))
        .layer(axum_middleware::from_fn(session_context))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(app_state)
}
