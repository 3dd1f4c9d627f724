//! crates/leafscan_core/src/workspace.rs
//!
//! The detection workspace: one view's image source and camera session.
//!
//! Everything a view acquires (the camera stream, the preview handle) is owned
//! here, so dropping or tearing down the workspace releases all of it.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::camera::CameraSession;
use crate::classifier::classify;
use crate::domain::{
    CameraState, CandidateImage, ClassifiedDetection, DetectionResult, FacingMode, PickedFile,
    SessionToken, SourceKind,
};
use crate::error::{CameraError, DetectionError, ErrorKind, ValidationError};
use crate::image_source::ImageSource;
use crate::ports::CameraDevice;
use crate::preview::PreviewStore;
use crate::submission::DetectionCoordinator;

#[derive(Debug, Clone, Serialize)]
pub struct SelectionSummary {
    pub preview_url: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub source_kind: SourceKind,
}

/// Serializable state of the workspace for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceSnapshot {
    pub camera: CameraState,
    pub facing_mode: FacingMode,
    pub fullscreen: bool,
    pub camera_error: Option<String>,
    pub selection: Option<SelectionSummary>,
    pub submission_pending: bool,
    pub last_result: Option<ClassifiedDetection>,
    pub last_error: Option<DetectionError>,
}

pub struct DetectionWorkspace {
    images: ImageSource,
    camera: CameraSession,
    last_result: Option<ClassifiedDetection>,
    last_error: Option<DetectionError>,
}

impl DetectionWorkspace {
    pub fn new(device: Arc<dyn CameraDevice>, previews: PreviewStore) -> Self {
        Self {
            images: ImageSource::new(previews),
            camera: CameraSession::new(device),
            last_result: None,
            last_error: None,
        }
    }

    pub fn camera(&self) -> &CameraSession {
        &self.camera
    }

    pub fn images(&self) -> &ImageSource {
        &self.images
    }

    // --- Image source ---

    pub fn select_file(&mut self, file: PickedFile) -> Result<CandidateImage, ValidationError> {
        self.images.from_file(file)
    }

    pub fn clear_selection(&mut self) {
        self.images.clear();
    }

    /// Takes the candidate out for submission, releasing its preview.
    pub fn take_for_submit(&mut self) -> Option<CandidateImage> {
        self.images.take_selection()
    }

    // --- Camera ---

    pub async fn open_camera(&mut self, facing: FacingMode) -> Result<(), CameraError> {
        self.camera.open(facing).await
    }

    pub async fn switch_camera(&mut self) -> Result<(), CameraError> {
        self.camera.switch_facing().await
    }

    /// One shot: captures a frame into the selection and closes the camera.
    pub async fn capture(&mut self) -> Result<CandidateImage, CameraError> {
        self.camera.capture(&mut self.images).await
    }

    pub fn close_camera(&mut self) {
        self.camera.close();
    }

    pub fn acknowledge_camera_error(&mut self) {
        self.camera.acknowledge_error();
    }

    pub fn check_camera(&mut self) -> Result<(), CameraError> {
        self.camera.check_health()
    }

    pub fn toggle_fullscreen(&mut self) -> bool {
        self.camera.toggle_fullscreen()
    }

    // --- Results ---

    /// Classifies and remembers a submission outcome. A failed submission puts
    /// the image back into the selection so it can be resubmitted.
    pub fn record_outcome(
        &mut self,
        image: CandidateImage,
        outcome: Result<DetectionResult, DetectionError>,
    ) -> Result<ClassifiedDetection, DetectionError> {
        match outcome {
            Ok(result) => {
                let classified = ClassifiedDetection {
                    classification: classify(result.accuracy, &result.status),
                    result,
                };
                self.last_result = Some(classified.clone());
                self.last_error = None;
                Ok(classified)
            }
            Err(error) => {
                if self.images.selection().is_none() {
                    self.images.reselect(image);
                }
                self.last_error = Some(error.clone());
                Err(error)
            }
        }
    }

    pub fn snapshot(&self, submission_pending: bool) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            camera: self.camera.state(),
            facing_mode: self.camera.facing(),
            fullscreen: self.camera.is_fullscreen(),
            camera_error: self.camera.last_error().map(ToString::to_string),
            selection: self.images.selection().map(|s| SelectionSummary {
                preview_url: s.preview.url(),
                file_name: s.image.file_name().to_string(),
                mime_type: s.image.mime_type().to_string(),
                size_bytes: s.image.size_bytes(),
                source_kind: s.image.source_kind(),
            }),
            submission_pending,
            last_result: self.last_result.clone(),
            last_error: self.last_error.clone(),
        }
    }

    /// Navigate-away: stops the camera and revokes the preview.
    pub fn teardown(&mut self) {
        self.camera.close();
        self.images.clear();
        self.last_result = None;
        self.last_error = None;
        info!("Detection workspace torn down");
    }
}

impl Drop for DetectionWorkspace {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Submits the workspace's current selection.
///
/// Order: token check, in-flight claim, then the selection is taken. A request
/// rejected at either of the first two steps leaves the selection in place. The
/// workspace lock is not held while the upload is awaited.
pub async fn submit_selection(
    workspace: &Mutex<DetectionWorkspace>,
    coordinator: &DetectionCoordinator,
    token: Option<&SessionToken>,
) -> Result<ClassifiedDetection, DetectionError> {
    let rejected = |error: DetectionError| async move {
        warn!(kind = error.kind.as_str(), error = %error, "Submission refused");
        workspace.lock().await.last_error = Some(error.clone());
        error
    };

    if token.is_none() {
        return Err(rejected(DetectionError::unauthenticated()).await);
    }
    // A refused claim leaves the workspace to the submission that holds the slot.
    let guard = coordinator.claim()?;

    let image = workspace.lock().await.take_for_submit();
    let Some(image) = image else {
        return Err(rejected(DetectionError::new(
            ErrorKind::InvalidState,
            "Select or capture an image first",
        ))
        .await);
    };

    let outcome = coordinator.submit_claimed(guard, &image, token).await;
    workspace.lock().await.record_outcome(image, outcome)
}
