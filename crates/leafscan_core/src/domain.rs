//! crates/leafscan_core/src/domain.rs
//!
//! Defines the core data structures of the capture-and-review pipeline.
//! Wire formats live next to the components that parse them; these types are
//! what the rest of the application works with.

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Upper bound for a candidate image, inclusive.
pub const MAX_IMAGE_BYTES: u64 = 5_242_880;

/// MIME types the detection backend accepts.
pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

/// Default number of history rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

//=========================================================================================
// Image acquisition
//=========================================================================================

/// Where a candidate image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    File,
    CameraCapture,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::File => "file",
            SourceKind::CameraCapture => "camera_capture",
        }
    }
}

/// Raw input from the file picker or a drag-and-drop. Both produce the same value.
#[derive(Debug, Clone)]
pub struct PickedFile {
    pub name: String,
    /// The type reported by the picker, if any.
    pub mime_type: Option<String>,
    pub bytes: Bytes,
}

/// The current frame of a live video stream, at its native resolution.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 pixels, `width * height * 4` bytes.
    pub rgba: Vec<u8>,
}

/// A validated, not-yet-submitted image ready for detection.
///
/// Only constructible through [`CandidateImage::new`], so every instance holds
/// `size_bytes <= MAX_IMAGE_BYTES` and an accepted MIME type.
#[derive(Debug, Clone)]
pub struct CandidateImage {
    bytes: Bytes,
    mime_type: String,
    file_name: String,
    source_kind: SourceKind,
}

impl CandidateImage {
    pub fn new(
        bytes: Bytes,
        mime_type: &str,
        file_name: impl Into<String>,
        source_kind: SourceKind,
    ) -> Result<Self, ValidationError> {
        let size_bytes = bytes.len() as u64;
        if size_bytes > MAX_IMAGE_BYTES {
            return Err(ValidationError::TooLarge {
                size_bytes,
                limit: MAX_IMAGE_BYTES,
            });
        }

        let mime_type = mime_type.trim().to_ascii_lowercase();
        if !ACCEPTED_MIME_TYPES.contains(&mime_type.as_str()) {
            return Err(ValidationError::UnsupportedType(mime_type));
        }

        Ok(Self {
            bytes,
            mime_type,
            file_name: file_name.into(),
            source_kind,
        })
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }
}

//=========================================================================================
// Camera
//=========================================================================================

/// Which physical camera a capture session targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    User,
    #[default]
    Environment,
}

impl FacingMode {
    pub fn opposite(self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
        }
    }
}

/// Lifecycle state of a camera session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum CameraState {
    #[default]
    Closed,
    Requesting,
    Active,
    Error(crate::error::ErrorKind),
}

impl fmt::Display for CameraState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraState::Closed => write!(f, "closed"),
            CameraState::Requesting => write!(f, "requesting"),
            CameraState::Active => write!(f, "active"),
            CameraState::Error(kind) => write!(f, "error ({})", kind.as_str()),
        }
    }
}

//=========================================================================================
// Detection results
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Disease {
    pub name: String,
    pub description: String,
    pub solutions: Vec<String>,
}

/// A successful inference, immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub id: String,
    pub image_url: String,
    /// Confidence score in `0..=100`.
    pub accuracy: f64,
    pub status: String,
    pub detected_at: DateTime<Utc>,
    pub disease: Option<Disease>,
    pub article_slug: Option<String>,
}

/// Severity bucket derived from a confidence score and status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Healthy,
    Tinggi,
    Sedang,
    Rendah,
    SangatRendah,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Healthy => "healthy",
            Tier::Tinggi => "tinggi",
            Tier::Sedang => "sedang",
            Tier::Rendah => "rendah",
            Tier::SangatRendah => "sangat_rendah",
        }
    }

    /// Display label shown in both the live result and the history table.
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Healthy => "Sehat",
            Tier::Tinggi => "Tinggi",
            Tier::Sedang => "Sedang",
            Tier::Rendah => "Rendah",
            Tier::SangatRendah => "Sangat Rendah",
        }
    }
}

/// Display-ready classification attached to live results and history records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub tier: Tier,
    pub tier_label: &'static str,
    pub status_label: String,
}

/// A live detection together with its classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedDetection {
    pub result: DetectionResult,
    pub classification: Classification,
}

//=========================================================================================
// History
//=========================================================================================

/// A past detection prepared for the history view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub id: String,
    pub image_url: String,
    pub accuracy: f64,
    pub status: String,
    pub status_label: String,
    pub disease_name: Option<String>,
    /// Detection time in the view's time zone.
    pub detected_at: DateTime<FixedOffset>,
    pub severity_tier: Tier,
    pub formatted_date: String,
    pub formatted_time: String,
}

impl HistoryRecord {
    /// The "Hasil" column: the disease name, or the status label for healthy leaves.
    pub fn result_label(&self) -> &str {
        self.disease_name.as_deref().unwrap_or(&self.status_label)
    }
}

/// Relative date range applied to the history view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindowFilter {
    #[default]
    All,
    Today,
    ThisWeek,
    ThisMonth,
}

impl TimeWindowFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindowFilter::All => "all",
            TimeWindowFilter::Today => "today",
            TimeWindowFilter::ThisWeek => "this_week",
            TimeWindowFilter::ThisMonth => "this_month",
        }
    }
}

impl FromStr for TimeWindowFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(TimeWindowFilter::All),
            "today" => Ok(TimeWindowFilter::Today),
            "week" | "this_week" => Ok(TimeWindowFilter::ThisWeek),
            "month" | "this_month" => Ok(TimeWindowFilter::ThisMonth),
            other => Err(format!("unknown time window '{}'", other)),
        }
    }
}

/// One page of a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Which set of records an export serializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportScope {
    /// What is on screen for the active filter.
    #[default]
    Filtered,
    /// The whole loaded history, ignoring the filter.
    All,
}

/// A client-side CSV download.
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Bytes,
}

//=========================================================================================
// Session
//=========================================================================================

/// Opaque bearer token supplied by the external session collaborator.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Returns `None` for an empty or whitespace-only token.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token.trim().to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}
