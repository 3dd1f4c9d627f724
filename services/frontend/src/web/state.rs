//! services/frontend/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use leafscan_core::ports::{CameraDevice, DetectionApi};
use leafscan_core::{
    CameraState, DetectionCoordinator, DetectionWorkspace, HistoryAggregator, PreviewStore,
};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// The service renders a single detection view, so there is one workspace.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub coordinator: Arc<DetectionCoordinator>,
    pub history: Arc<HistoryAggregator>,
    pub workspace: Arc<Mutex<DetectionWorkspace>>,
    /// Camera state, readable while a camera command holds the workspace.
    pub camera_state: watch::Receiver<CameraState>,
    pub previews: PreviewStore,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        api: Arc<dyn DetectionApi>,
        camera: Arc<dyn CameraDevice>,
    ) -> Self {
        let previews = PreviewStore::new();
        let workspace = DetectionWorkspace::new(camera, previews.clone());
        let camera_state = workspace.camera().subscribe();
        Self {
            coordinator: Arc::new(DetectionCoordinator::new(api.clone())),
            history: Arc::new(HistoryAggregator::new(
                api,
                config.history_zone,
                config.history_fallback,
            )),
            workspace: Arc::new(Mutex::new(workspace)),
            camera_state,
            previews,
            config,
        }
    }
}
