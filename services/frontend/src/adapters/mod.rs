pub mod http_api;
pub mod snapshot_camera;

pub use http_api::HttpDetectionApi;
pub use snapshot_camera::SnapshotCamera;
