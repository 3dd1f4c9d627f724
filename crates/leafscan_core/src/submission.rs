//! crates/leafscan_core/src/submission.rs
//!
//! Detection submission coordinator: uploads a validated candidate image and
//! turns the backend reply into a `DetectionResult` or a tagged `DetectionError`.
//!
//! At most one submission is in flight per coordinator. A second `submit` while
//! one is pending is rejected with `SubmissionInFlight`; nothing is queued and
//! nothing is retried.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::domain::{CandidateImage, DetectionResult, SessionToken};
use crate::error::{DetectionError, ErrorKind};
use crate::ports::{ApiReply, DetectionApi, ImageUpload, PortError};
use crate::wire::{error_message, DetectionRecord, Envelope};

/// Multipart field name expected by `POST /detections`.
pub const IMAGE_FIELD: &str = "image";

/// Releases the in-flight slot on every exit path, including a dropped future.
pub struct InFlightGuard {
    slot: Arc<watch::Sender<bool>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.slot.send_replace(false);
    }
}

pub struct DetectionCoordinator {
    api: Arc<dyn DetectionApi>,
    in_flight: Arc<watch::Sender<bool>>,
}

impl DetectionCoordinator {
    pub fn new(api: Arc<dyn DetectionApi>) -> Self {
        let (in_flight, _) = watch::channel(false);
        Self {
            api,
            in_flight: Arc::new(in_flight),
        }
    }

    /// Whether a submission is currently awaiting the backend.
    pub fn is_pending(&self) -> bool {
        *self.in_flight.borrow()
    }

    /// Observes the pending flag, so a UI can disable its submit affordance.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.in_flight.subscribe()
    }

    /// Claims the single in-flight slot.
    pub fn claim(&self) -> Result<InFlightGuard, DetectionError> {
        let claimed = self.in_flight.send_if_modified(|pending| {
            if *pending {
                false
            } else {
                *pending = true;
                true
            }
        });
        if claimed {
            Ok(InFlightGuard {
                slot: self.in_flight.clone(),
            })
        } else {
            Err(DetectionError::in_flight())
        }
    }

    /// Uploads `image` and returns the parsed detection.
    pub async fn submit(
        &self,
        image: &CandidateImage,
        token: Option<&SessionToken>,
    ) -> Result<DetectionResult, DetectionError> {
        let token = token.ok_or_else(DetectionError::unauthenticated)?;
        let _guard = self.claim()?;
        self.upload(image, token).await
    }

    /// Same as [`submit`](Self::submit) for a caller that already holds the slot.
    pub async fn submit_claimed(
        &self,
        _guard: InFlightGuard,
        image: &CandidateImage,
        token: Option<&SessionToken>,
    ) -> Result<DetectionResult, DetectionError> {
        let token = token.ok_or_else(DetectionError::unauthenticated)?;
        self.upload(image, token).await
    }

    async fn upload(
        &self,
        image: &CandidateImage,
        token: &SessionToken,
    ) -> Result<DetectionResult, DetectionError> {
        let upload = ImageUpload {
            field: IMAGE_FIELD,
            file_name: image.file_name().to_string(),
            mime_type: image.mime_type().to_string(),
            bytes: image.bytes().clone(),
        };
        info!(
            file_name = %upload.file_name,
            size_bytes = image.size_bytes(),
            source = ?image.source_kind(),
            "Submitting image for detection"
        );

        let reply = self
            .api
            .upload_image(token, upload)
            .await
            .map_err(network_failure)?;

        let outcome = interpret_detection_reply(&reply);
        match &outcome {
            Ok(result) => info!(
                detection_id = %result.id,
                accuracy = result.accuracy,
                "Detection received"
            ),
            Err(e) => warn!(
                status = reply.status,
                kind = e.kind.as_str(),
                error = %e,
                "Detection rejected"
            ),
        }
        outcome
    }

    /// Fetches the article behind a detection's "learn more" link.
    pub async fn article(
        &self,
        slug: &str,
        token: Option<&SessionToken>,
    ) -> Result<Value, DetectionError> {
        let token = token.ok_or_else(DetectionError::unauthenticated)?;
        let reply = self
            .api
            .fetch_article(token, slug)
            .await
            .map_err(network_failure)?;
        check_status(&reply)?;
        serde_json::from_slice(&reply.body).map_err(|e| {
            DetectionError::new(
                ErrorKind::ServerRejected,
                format!("Malformed article response: {}", e),
            )
        })
    }
}

pub(crate) fn network_failure(e: PortError) -> DetectionError {
    warn!(error = %e, "Backend request failed");
    DetectionError::new(ErrorKind::NetworkFailure, e.to_string())
}

/// 401 is `SessionExpired`; any other non-2xx is `ServerRejected`.
pub(crate) fn check_status(reply: &ApiReply) -> Result<(), DetectionError> {
    if reply.status == 401 {
        return Err(DetectionError::session_expired());
    }
    if !reply.is_success() {
        let message = error_message(&reply.body)
            .unwrap_or_else(|| format!("Request failed with HTTP {}", reply.status));
        return Err(DetectionError::new(ErrorKind::ServerRejected, message));
    }
    Ok(())
}

/// Maps a `POST /detections` reply to the tagged outcome.
pub fn interpret_detection_reply(reply: &ApiReply) -> Result<DetectionResult, DetectionError> {
    check_status(reply)?;

    let envelope: Envelope<DetectionRecord> = serde_json::from_slice(&reply.body).map_err(|e| {
        DetectionError::new(
            ErrorKind::ServerRejected,
            format!("Malformed detection response: {}", e),
        )
    })?;

    if envelope.success != Some(true) {
        let message = envelope
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "The server did not confirm the detection".to_string());
        return Err(DetectionError::new(ErrorKind::ServerRejected, message));
    }

    let record = envelope.data.ok_or_else(|| {
        DetectionError::new(ErrorKind::ServerRejected, "Detection response carried no data")
    })?;
    Ok(record.to_domain(Utc::now()))
}
