//! crates/leafscan_core/src/image_source.rs
//!
//! Normalizes a picked file or a captured camera frame into a single
//! [`CandidateImage`] and owns the one live preview handle of the current selection.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use tracing::{debug, info};

use crate::domain::{CandidateImage, PickedFile, SourceKind, VideoFrame};
use crate::error::ValidationError;
use crate::preview::{PreviewHandle, PreviewStore};

/// JPEG quality used for camera captures (0.9 on a 0..1 scale).
pub const CAMERA_JPEG_QUALITY: u8 = 90;

/// File name given to captured frames in the multipart upload.
pub const CAMERA_FILE_NAME: &str = "camera-capture.jpg";

/// Validates picker or drag-and-drop input.
///
/// When the picker did not report a type, it is inferred from the extension.
/// Size is checked before type, so an oversized file always reports `TooLarge`.
pub fn validate_file(file: PickedFile) -> Result<CandidateImage, ValidationError> {
    let mime_type = file
        .mime_type
        .filter(|m| !m.trim().is_empty())
        .or_else(|| mime_from_extension(&file.name).map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string());

    CandidateImage::new(file.bytes, &mime_type, file.name, SourceKind::File)
}

fn mime_from_extension(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// Encodes an RGBA frame as JPEG at native resolution. CPU bound.
fn encode_frame(frame: VideoFrame) -> Result<Bytes, ValidationError> {
    let (width, height) = (frame.width, frame.height);
    let rgba = image::RgbaImage::from_raw(width, height, frame.rgba).ok_or_else(|| {
        ValidationError::EncodeFailed(format!(
            "frame buffer does not match {}x{} RGBA",
            width, height
        ))
    })?;
    let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, CAMERA_JPEG_QUALITY)
        .encode(rgb.as_raw(), width, height, image::ColorType::Rgb8.into())
        .map_err(|e| ValidationError::EncodeFailed(e.to_string()))?;

    Ok(Bytes::from(jpeg))
}

/// The current selection: a candidate image and its live preview.
#[derive(Debug)]
pub struct Selection {
    pub image: CandidateImage,
    pub preview: PreviewHandle,
}

/// Image source for one view. Holds at most one selection, hence at most one preview handle.
pub struct ImageSource {
    previews: PreviewStore,
    selection: Option<Selection>,
}

impl ImageSource {
    pub fn new(previews: PreviewStore) -> Self {
        Self {
            previews,
            selection: None,
        }
    }

    /// Validates a picked file and makes it the current selection.
    ///
    /// A rejected file leaves the previous selection untouched.
    pub fn from_file(&mut self, file: PickedFile) -> Result<CandidateImage, ValidationError> {
        let name = file.name.clone();
        let image = validate_file(file).inspect_err(|e| {
            info!(file_name = %name, error = %e, "Picked file rejected");
        })?;
        self.select(image.clone());
        Ok(image)
    }

    /// Encodes the current video frame as JPEG and makes it the current selection.
    ///
    /// The encode runs on the blocking pool; the caller suspends until its single result.
    pub async fn from_camera_frame(
        &mut self,
        frame: VideoFrame,
    ) -> Result<CandidateImage, ValidationError> {
        let jpeg = tokio::task::spawn_blocking(move || encode_frame(frame))
            .await
            .map_err(|e| ValidationError::EncodeFailed(e.to_string()))??;

        let image =
            CandidateImage::new(jpeg, "image/jpeg", CAMERA_FILE_NAME, SourceKind::CameraCapture)?;
        self.select(image.clone());
        Ok(image)
    }

    /// Puts an already validated candidate back, e.g. after a failed submission.
    pub fn reselect(&mut self, image: CandidateImage) {
        self.select(image);
    }

    fn select(&mut self, image: CandidateImage) {
        // The old handle must be gone before the new one exists.
        self.selection = None;
        let preview = self.previews.create(image.mime_type(), image.bytes().clone());
        debug!(
            preview = %preview.url(),
            size_bytes = image.size_bytes(),
            source = ?image.source_kind(),
            "Candidate image selected"
        );
        self.selection = Some(Selection { image, preview });
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn preview_url(&self) -> Option<String> {
        self.selection.as_ref().map(|s| s.preview.url())
    }

    /// Removes the candidate for submission. Its preview is released.
    pub fn take_selection(&mut self) -> Option<CandidateImage> {
        self.selection.take().map(|s| s.image)
    }

    /// Drops the current selection and releases its preview.
    pub fn clear(&mut self) {
        if self.selection.take().is_some() {
            debug!("Candidate image cleared");
        }
    }
}
