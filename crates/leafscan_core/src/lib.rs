pub mod camera;
pub mod classifier;
pub mod domain;
pub mod error;
pub mod history;
pub mod image_source;
pub mod ports;
pub mod preview;
pub mod submission;
mod wire;
pub mod workspace;

pub use camera::CameraSession;
pub use domain::{
    CameraState, CandidateImage, Classification, ClassifiedDetection, CsvExport, DetectionResult,
    Disease, ExportScope, FacingMode, HistoryRecord, Page, PickedFile, SessionToken, SourceKind,
    Tier, TimeWindowFilter, VideoFrame,
};
pub use error::{CameraError, DetectionError, ErrorKind, ValidationError};
pub use history::{HistoryAggregator, HistoryFallback, HistoryLoad, HistorySource};
pub use image_source::ImageSource;
pub use ports::{
    ApiReply, CameraDevice, DetectionApi, ImageUpload, MediaStream, PortError, PortResult,
    StreamConstraints,
};
pub use preview::{PreviewHandle, PreviewStore};
pub use submission::DetectionCoordinator;
pub use workspace::{DetectionWorkspace, WorkspaceSnapshot};
