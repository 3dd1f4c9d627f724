//! crates/leafscan_core/src/camera.rs
//!
//! Camera session manager: the exclusive owner of a device video stream.
//!
//! States: `Closed -> Requesting -> Active -> Closed`, with `Error` reachable
//! from `Requesting`/`Active` and left through `close()` or `acknowledge_error()`.
//! The granted stream is wrapped in [`OwnedStream`], which stops its tracks on
//! drop, so every exit path (close, failure, teardown) releases the device. A
//! command whose future is dropped mid-request leaves the session `Closed`.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::{CameraState, CandidateImage, FacingMode};
use crate::error::CameraError;
use crate::image_source::ImageSource;
use crate::ports::{CameraDevice, MediaStream, StreamConstraints};

/// A granted stream. Dropping it stops every track.
struct OwnedStream(Box<dyn MediaStream>);

impl OwnedStream {
    fn live_tracks(&self) -> usize {
        self.0.live_tracks()
    }
}

impl Drop for OwnedStream {
    fn drop(&mut self) {
        self.0.stop_tracks();
        debug!(stream_id = %self.0.id(), "Camera stream tracks stopped");
    }
}

/// Borrows the session for one suspending command (open, switch, capture).
/// If the command's future is dropped before [`CommandGuard::settle`], the
/// session is reset to `Closed` with no stream held.
struct CommandGuard<'a> {
    session: &'a mut CameraSession,
    settled: bool,
}

impl<'a> CommandGuard<'a> {
    fn new(session: &'a mut CameraSession) -> Self {
        Self {
            session,
            settled: false,
        }
    }

    fn settle(&mut self) -> &mut CameraSession {
        self.settled = true;
        &mut *self.session
    }
}

impl Drop for CommandGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.session.abandon();
        }
    }
}

/// One camera session per view.
pub struct CameraSession {
    device: Arc<dyn CameraDevice>,
    stream: Option<OwnedStream>,
    facing: FacingMode,
    fullscreen: bool,
    last_error: Option<CameraError>,
    state: Arc<watch::Sender<CameraState>>,
}

impl CameraSession {
    pub fn new(device: Arc<dyn CameraDevice>) -> Self {
        let (state, _) = watch::channel(CameraState::Closed);
        Self {
            device,
            stream: None,
            facing: FacingMode::default(),
            fullscreen: false,
            last_error: None,
            state: Arc::new(state),
        }
    }

    //-------------------------------------------------------------------------------------
    // Observers
    //-------------------------------------------------------------------------------------

    pub fn state(&self) -> CameraState {
        *self.state.borrow()
    }

    /// A receiver that sees every state transition, including `Requesting`,
    /// without access to the session itself.
    pub fn subscribe(&self) -> watch::Receiver<CameraState> {
        self.state.subscribe()
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn last_error(&self) -> Option<&CameraError> {
        self.last_error.as_ref()
    }

    /// Live tracks of the held stream, `0` when no stream is held.
    pub fn live_tracks(&self) -> usize {
        self.stream.as_ref().map_or(0, OwnedStream::live_tracks)
    }

    //-------------------------------------------------------------------------------------
    // Commands
    //-------------------------------------------------------------------------------------

    /// Requests a video stream for `facing` and moves to `Active`.
    ///
    /// Opening an already active session replaces its stream; the old tracks are
    /// stopped before the new request is made.
    pub async fn open(&mut self, facing: FacingMode) -> Result<(), CameraError> {
        if self.stream.take().is_some() {
            info!("Camera already open, restarting stream");
        }
        self.last_error = None;
        self.facing = facing;
        self.set_state(CameraState::Requesting);

        let device = self.device.clone();
        let mut guard = CommandGuard::new(self);
        if !device.is_supported() {
            return Err(guard.settle().fail(CameraError::NoMediaSupport));
        }

        let requested = device.request_stream(StreamConstraints::video(facing)).await;
        let session = guard.settle();
        match requested {
            Ok(stream) => {
                info!(stream_id = %stream.id(), facing = facing.as_str(), "Camera stream granted");
                session.stream = Some(OwnedStream(stream));
                session.set_state(CameraState::Active);
                Ok(())
            }
            Err(e) => Err(session.fail(e)),
        }
    }

    /// Stops the current tracks and requests the opposite facing mode.
    ///
    /// On failure the session is in `Error` and references no stream.
    pub async fn switch_facing(&mut self) -> Result<(), CameraError> {
        self.ensure_active("switch_facing")?;
        let next = self.facing.opposite();

        // Old tracks stop here, before the new request.
        self.stream = None;
        self.set_state(CameraState::Requesting);

        let device = self.device.clone();
        let mut guard = CommandGuard::new(self);
        let requested = device.request_stream(StreamConstraints::video(next)).await;
        let session = guard.settle();
        match requested {
            Ok(stream) => {
                info!(stream_id = %stream.id(), facing = next.as_str(), "Camera facing switched");
                session.stream = Some(OwnedStream(stream));
                session.facing = next;
                session.set_state(CameraState::Active);
                Ok(())
            }
            Err(e) => Err(session.fail(e)),
        }
    }

    /// Captures one frame into `source`, then closes the session whatever the outcome.
    pub async fn capture(
        &mut self,
        source: &mut ImageSource,
    ) -> Result<CandidateImage, CameraError> {
        self.ensure_active("capture")?;
        let mut guard = CommandGuard::new(self);
        let Some(stream) = guard.session.stream.take() else {
            return Err(guard.settle().fail(CameraError::DeviceLost));
        };

        let result = async {
            let frame = stream
                .0
                .read_frame()
                .await
                .map_err(|e| CameraError::DeviceUnavailable(e.to_string()))?;
            debug!(width = frame.width, height = frame.height, "Frame read from camera");
            source.from_camera_frame(frame).await.map_err(CameraError::from)
        }
        .await;

        drop(stream);
        guard.settle().close();

        match &result {
            Ok(image) => info!(size_bytes = image.size_bytes(), "Camera frame captured"),
            Err(e) => warn!(error = %e, "Camera capture failed"),
        }
        result
    }

    /// Stops every track, forgets the stream and resets the session. Idempotent.
    pub fn close(&mut self) {
        let had_stream = self.stream.take().is_some();
        let pristine = self.state() == CameraState::Closed
            && self.facing == FacingMode::default()
            && !self.fullscreen
            && self.last_error.is_none();
        if !had_stream && pristine {
            return;
        }

        self.facing = FacingMode::default();
        self.fullscreen = false;
        self.last_error = None;
        self.set_state(CameraState::Closed);
        info!(released_stream = had_stream, "Camera session closed");
    }

    /// Detects a revoked device: an active session whose tracks all ended.
    pub fn check_health(&mut self) -> Result<(), CameraError> {
        if self.state() == CameraState::Active && self.live_tracks() == 0 {
            return Err(self.fail(CameraError::DeviceLost));
        }
        Ok(())
    }

    /// `Error -> Closed`. No-op in any other state.
    pub fn acknowledge_error(&mut self) {
        if matches!(self.state(), CameraState::Error(_)) {
            self.close();
        }
    }

    /// Presentation flag for the preview host element.
    pub fn toggle_fullscreen(&mut self) -> bool {
        self.fullscreen = !self.fullscreen;
        debug!(fullscreen = self.fullscreen, "Camera fullscreen toggled");
        self.fullscreen
    }

    //-------------------------------------------------------------------------------------
    // Helpers
    //-------------------------------------------------------------------------------------

    fn ensure_active(&self, command: &'static str) -> Result<(), CameraError> {
        let state = self.state();
        if state == CameraState::Active && self.stream.is_some() {
            Ok(())
        } else {
            Err(CameraError::InvalidState {
                command,
                state: state.to_string(),
            })
        }
    }

    /// Reset after a command future was dropped mid-flight.
    fn abandon(&mut self) {
        self.stream = None;
        self.facing = FacingMode::default();
        self.fullscreen = false;
        self.last_error = None;
        self.set_state(CameraState::Closed);
        warn!("Camera command abandoned, session closed");
    }

    fn fail(&mut self, error: CameraError) -> CameraError {
        self.stream = None;
        self.set_state(CameraState::Error(error.kind()));
        self.last_error = Some(error.clone());
        warn!(error = %error, kind = error.kind().as_str(), "Camera session failed");
        error
    }

    fn set_state(&self, next: CameraState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Camera state changed");
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.close();
    }
}
