mod common;

use bytes::Bytes;
use chrono::{FixedOffset, TimeZone};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

use common::{detection_body, token, FakeBackend, FakeCamera};
use leafscan_core::history::{export_view, filter, paginate, CSV_HEADER};
use leafscan_core::workspace::submit_selection;
use leafscan_core::{
    CameraState, DetectionCoordinator, DetectionWorkspace, ErrorKind, ExportScope, FacingMode,
    HistoryAggregator, HistoryFallback, HistorySource, PickedFile, PreviewStore, SourceKind, Tier,
    TimeWindowFilter,
};

fn wib() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).unwrap()
}

fn picked(name: &str, mime: &str, len: usize) -> PickedFile {
    PickedFile {
        name: name.to_string(),
        mime_type: Some(mime.to_string()),
        bytes: Bytes::from(vec![1u8; len]),
    }
}

struct Harness {
    camera: Arc<FakeCamera>,
    backend: Arc<FakeBackend>,
    previews: PreviewStore,
    workspace: Mutex<DetectionWorkspace>,
    coordinator: DetectionCoordinator,
}

fn harness(camera: FakeCamera, backend: FakeBackend) -> Harness {
    let camera = Arc::new(camera);
    let backend = Arc::new(backend);
    let previews = PreviewStore::new();
    Harness {
        workspace: Mutex::new(DetectionWorkspace::new(camera.clone(), previews.clone())),
        coordinator: DetectionCoordinator::new(backend.clone()),
        camera,
        backend,
        previews,
    }
}

#[tokio::test]
async fn oversized_jpeg_is_rejected_without_network() {
    let h = harness(FakeCamera::default(), FakeBackend::new());
    let err = h
        .workspace
        .lock()
        .await
        .select_file(picked("sawah.jpg", "image/jpeg", 6 * 1024 * 1024))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooLarge);

    let err = submit_selection(&h.workspace, &h.coordinator, Some(&token()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
    assert_eq!(h.backend.upload_count(), 0);
    assert_eq!(h.previews.live_count(), 0);
}

#[tokio::test]
async fn png_upload_is_classified_high() {
    let h = harness(FakeCamera::default(), FakeBackend::new());
    h.workspace
        .lock()
        .await
        .select_file(picked("daun.png", "image/png", 2 * 1024 * 1024))
        .unwrap();
    assert_eq!(h.previews.live_count(), 1);

    let detection = submit_selection(&h.workspace, &h.coordinator, Some(&token()))
        .await
        .unwrap();

    assert_eq!(detection.classification.tier, Tier::Tinggi);
    assert_eq!(detection.classification.status_label, "Terdeteksi");
    assert_eq!(detection.result.disease.as_ref().unwrap().name, "Blas Daun");
    assert_eq!(h.backend.upload_count(), 1);

    let upload = h.backend.last_upload.lock().unwrap().clone().unwrap();
    assert_eq!(upload.field, "image");
    assert_eq!(upload.file_name, "daun.png");
    assert_eq!(upload.mime_type, "image/png");
    assert_eq!(upload.bytes.len(), 2 * 1024 * 1024);

    // The preview is released on submit.
    assert_eq!(h.previews.live_count(), 0);
    let snapshot = h.workspace.lock().await.snapshot(h.coordinator.is_pending());
    assert!(snapshot.selection.is_none());
    assert_eq!(snapshot.last_result.unwrap().result.id, "42");
}

#[tokio::test]
async fn missing_token_keeps_selection_and_skips_network() {
    let h = harness(FakeCamera::default(), FakeBackend::new());
    h.workspace
        .lock()
        .await
        .select_file(picked("daun.jpg", "image/jpeg", 1024))
        .unwrap();

    let err = submit_selection(&h.workspace, &h.coordinator, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthenticated);
    assert_eq!(h.backend.upload_count(), 0);

    let snapshot = h.workspace.lock().await.snapshot(false);
    assert!(snapshot.selection.is_some());
    assert_eq!(snapshot.last_error.unwrap().kind, ErrorKind::Unauthenticated);
}

#[tokio::test]
async fn failed_submission_can_be_resubmitted() {
    let mut backend = FakeBackend::new();
    backend.upload_status = 401;
    backend.upload_body = "{}".to_string();
    let h = harness(FakeCamera::default(), backend);
    h.workspace
        .lock()
        .await
        .select_file(picked("daun.jpg", "image/jpeg", 1024))
        .unwrap();

    let err = submit_selection(&h.workspace, &h.coordinator, Some(&token()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::SessionExpired);

    let snapshot = h.workspace.lock().await.snapshot(h.coordinator.is_pending());
    let selection = snapshot.selection.unwrap();
    assert_eq!(selection.file_name, "daun.jpg");
    assert_eq!(h.previews.live_count(), 1);
    assert!(!snapshot.submission_pending);
}

#[tokio::test]
async fn second_submit_is_rejected_while_pending() {
    let gate = Arc::new(Notify::new());
    let mut backend = FakeBackend::new();
    backend.gate = Some(gate.clone());
    let h = Arc::new(harness(FakeCamera::default(), backend));
    h.workspace
        .lock()
        .await
        .select_file(picked("daun.jpg", "image/jpeg", 1024))
        .unwrap();

    let first = {
        let h = h.clone();
        tokio::spawn(async move {
            submit_selection(&h.workspace, &h.coordinator, Some(&token())).await
        })
    };
    let mut pending = h.coordinator.subscribe();
    pending.wait_for(|p| *p).await.unwrap();

    let err = submit_selection(&h.workspace, &h.coordinator, Some(&token()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::SubmissionInFlight);

    gate.notify_one();
    let detection = tokio::time::timeout(Duration::from_secs(5), first)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(detection.result.id, "42");
    assert_eq!(h.backend.upload_count(), 1);
    assert!(!h.coordinator.is_pending());
}

#[tokio::test]
async fn camera_capture_becomes_the_selection() {
    let h = harness(FakeCamera::default(), FakeBackend::new());
    let mut workspace = h.workspace.lock().await;
    workspace.open_camera(FacingMode::Environment).await.unwrap();
    assert_eq!(workspace.camera().state(), CameraState::Active);
    assert_eq!(h.camera.live_tracks(), 1);

    let image = workspace.capture().await.unwrap();
    assert_eq!(image.source_kind(), SourceKind::CameraCapture);
    assert_eq!(image.mime_type(), "image/jpeg");
    assert_eq!(workspace.camera().state(), CameraState::Closed);
    assert_eq!(h.camera.live_tracks(), 0);
    assert_eq!(h.previews.live_count(), 1);
}

#[tokio::test]
async fn failed_switch_leaks_no_track() {
    let h = harness(
        FakeCamera {
            fail_facing: Some(FacingMode::User),
            ..Default::default()
        },
        FakeBackend::new(),
    );
    let mut workspace = h.workspace.lock().await;
    workspace.open_camera(FacingMode::Environment).await.unwrap();

    let err = workspace.switch_camera().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceUnavailable);
    assert_eq!(
        workspace.camera().state(),
        CameraState::Error(ErrorKind::DeviceUnavailable)
    );
    assert_eq!(h.camera.live_tracks(), 0);

    workspace.acknowledge_camera_error();
    assert_eq!(workspace.camera().state(), CameraState::Closed);
}

#[tokio::test]
async fn teardown_releases_everything() {
    let h = harness(FakeCamera::default(), FakeBackend::new());
    {
        let mut workspace = h.workspace.lock().await;
        workspace
            .select_file(picked("daun.jpg", "image/jpeg", 1024))
            .unwrap();
        workspace.open_camera(FacingMode::User).await.unwrap();
        workspace.toggle_fullscreen();
        assert_eq!(h.camera.live_tracks(), 1);
        assert_eq!(h.previews.live_count(), 1);

        workspace.teardown();
        assert_eq!(h.camera.live_tracks(), 0);
        assert_eq!(h.previews.live_count(), 0);
        assert!(!workspace.camera().is_fullscreen());

        // Idempotent.
        workspace.teardown();
        assert_eq!(workspace.camera().state(), CameraState::Closed);
    }

    // Dropping the workspace releases the same resources.
    let mut workspace = DetectionWorkspace::new(h.camera.clone(), h.previews.clone());
    workspace
        .select_file(picked("daun.png", "image/png", 1024))
        .unwrap();
    workspace.open_camera(FacingMode::Environment).await.unwrap();
    drop(workspace);
    assert_eq!(h.camera.live_tracks(), 0);
    assert_eq!(h.previews.live_count(), 0);
}

#[tokio::test]
async fn history_unauthorized_falls_back_to_samples() {
    let mut backend = FakeBackend::new();
    backend.history_status = 401;
    let aggregator = HistoryAggregator::new(Arc::new(backend), wib(), HistoryFallback::Sample);

    let load = aggregator.load(Some(&token())).await;
    assert_eq!(load.source, HistorySource::Fallback);
    assert_eq!(load.filter, TimeWindowFilter::All);
    assert_eq!(load.advisory.unwrap().kind, ErrorKind::SessionExpired);
    assert!(!load.records.is_empty());

    let empty = HistoryAggregator::new(Arc::new(FakeBackend::new()), wib(), HistoryFallback::Empty)
        .load(None)
        .await;
    assert_eq!(empty.advisory.unwrap().kind, ErrorKind::Unauthenticated);
    assert!(empty.records.is_empty());
}

#[tokio::test]
async fn filtered_export_matches_the_view() {
    let mut backend = FakeBackend::new();
    backend.history_body = r#"{"success": true, "data": [
        {"id": 1, "accuracy": 92.5, "status": "Terdeteksi Penyakit", "detectedAt": "2026-10-17T02:00:00Z",
         "disease": {"name": "Blas Daun"}},
        {"id": 2, "accuracy": 81, "status": "Infected", "detectedAt": "2026-10-13T02:00:00Z",
         "disease": "Bercak Coklat"},
        {"id": 3, "accuracy": 99, "status": "Healthy", "detectedAt": "2026-09-30T02:00:00Z"}
    ]}"#
    .to_string();
    let aggregator = HistoryAggregator::new(Arc::new(backend), wib(), HistoryFallback::Sample);
    let load = aggregator.load(Some(&token())).await;
    assert_eq!(load.source, HistorySource::Remote);
    assert_eq!(load.records.len(), 3);

    let now = wib().with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
    let week = filter(&load.records, TimeWindowFilter::ThisWeek, now);
    let page = paginate(&week, 1, 10);
    assert_eq!(page.total_items, 2);

    let export = export_view(&load.records, TimeWindowFilter::ThisWeek, ExportScope::Filtered, now);
    let text = String::from_utf8(export.bytes.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], CSV_HEADER.join(","));
    assert_eq!(lines.len(), 1 + page.items.len());
    for (line, record) in lines[1..].iter().zip(&page.items) {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields[0], record.id);
        assert_eq!(fields[3], record.severity_tier.label());
    }
    assert_eq!(lines[1], "1,Blas Daun,92.5%,Tinggi,17/10/2026,09.00,Terdeteksi");

    let everything = export_view(&load.records, TimeWindowFilter::ThisWeek, ExportScope::All, now);
    let text = String::from_utf8(everything.bytes.to_vec()).unwrap();
    assert_eq!(text.lines().count(), 4);
    assert!(text.ends_with("3,Sehat,99.0%,Sehat,30/09/2026,09.00,Sehat"));
}

#[tokio::test]
async fn healthy_result_is_never_tiered_by_accuracy() {
    let mut backend = FakeBackend::new();
    backend.upload_body = detection_body(55.0, "Healthy");
    let h = harness(FakeCamera::default(), backend);
    h.workspace
        .lock()
        .await
        .select_file(picked("daun.jpg", "image/jpeg", 1024))
        .unwrap();

    let detection = submit_selection(&h.workspace, &h.coordinator, Some(&token()))
        .await
        .unwrap();
    assert_eq!(detection.classification.tier, Tier::Healthy);
    assert_eq!(detection.classification.tier_label, "Sehat");
}
