//! crates/leafscan_core/src/history.rs
//!
//! History aggregator and exporter.
//!
//! Loads past detections, classifies each through the same rules as the live
//! result, and provides the pure filter / paginate / CSV operations the history
//! view is built from. A failed load never breaks the view: it degrades to the
//! configured fallback set and reports the failure as an advisory.

use bytes::Bytes;
use chrono::{DateTime, Datelike, Duration, FixedOffset};
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::classifier::classify;
use crate::domain::{
    CsvExport, DetectionResult, ExportScope, HistoryRecord, Page, SessionToken, TimeWindowFilter,
    DEFAULT_PAGE_SIZE,
};
use crate::error::{DetectionError, ErrorKind};
use crate::ports::DetectionApi;
use crate::submission::{check_status, network_failure};
use crate::wire::{DetectionRecord, Envelope};

pub const CSV_HEADER: [&str; 7] = [
    "ID", "Hasil", "Akurasi", "Tingkat", "Tanggal", "Waktu", "Status",
];
pub const CSV_MIME_TYPE: &str = "text/csv";

const DATE_FORMAT: &str = "%d/%m/%Y";
const TIME_FORMAT: &str = "%H.%M";

/// Shown when the backend history cannot be loaded.
const SAMPLE_HISTORY: &str = r#"{"data": [
    {"id": "sample-1", "imageUrl": "/samples/blast.jpg", "accuracy": 94.5, "status": "Terdeteksi Penyakit",
     "detectedAt": "2025-03-14T09:12:00+07:00", "disease": {"name": "Blas Daun", "description": "", "solutions": []}},
    {"id": "sample-2", "imageUrl": "/samples/brown-spot.jpg", "accuracy": 86.1, "status": "Terdeteksi Penyakit",
     "detectedAt": "2025-03-12T15:40:00+07:00", "disease": {"name": "Bercak Coklat", "description": "", "solutions": []}},
    {"id": "sample-3", "imageUrl": "/samples/healthy.jpg", "accuracy": 97.3, "status": "Healthy",
     "detectedAt": "2025-03-10T07:05:00+07:00"},
    {"id": "sample-4", "imageUrl": "/samples/tungro.jpg", "accuracy": 74.8, "status": "Terdeteksi Penyakit",
     "detectedAt": "2025-03-03T11:20:00+07:00", "disease": {"name": "Tungro", "description": "", "solutions": []}},
    {"id": "sample-5", "imageUrl": "/samples/hispa.jpg", "accuracy": 63.0, "status": "Terdeteksi Penyakit",
     "detectedAt": "2025-02-21T16:45:00+07:00", "disease": {"name": "Hispa", "description": "", "solutions": []}}
]}"#;

/// What the view shows when loading fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryFallback {
    #[default]
    Sample,
    Empty,
}

impl FromStr for HistoryFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sample" => Ok(HistoryFallback::Sample),
            "empty" => Ok(HistoryFallback::Empty),
            other => Err(format!("'{}' is not one of sample, empty", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySource {
    Remote,
    Fallback,
}

impl HistorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistorySource::Remote => "remote",
            HistorySource::Fallback => "fallback",
        }
    }
}

/// Result of a history load. Always renderable.
#[derive(Debug, Clone)]
pub struct HistoryLoad {
    /// Newest first.
    pub records: Vec<HistoryRecord>,
    /// Non-fatal failure that caused a fallback.
    pub advisory: Option<DetectionError>,
    /// The filter the view starts with after a load.
    pub filter: TimeWindowFilter,
    pub source: HistorySource,
}

pub struct HistoryAggregator {
    api: Arc<dyn DetectionApi>,
    zone: FixedOffset,
    fallback: HistoryFallback,
}

impl HistoryAggregator {
    /// `zone` is the time zone dates are shown and filtered in.
    pub fn new(api: Arc<dyn DetectionApi>, zone: FixedOffset, fallback: HistoryFallback) -> Self {
        Self { api, zone, fallback }
    }

    pub fn zone(&self) -> FixedOffset {
        self.zone
    }

    pub async fn load(&self, token: Option<&SessionToken>) -> HistoryLoad {
        match self.fetch(token).await {
            Ok(records) => {
                info!(count = records.len(), "Detection history loaded");
                HistoryLoad {
                    records,
                    advisory: None,
                    filter: TimeWindowFilter::All,
                    source: HistorySource::Remote,
                }
            }
            Err(advisory) => {
                warn!(
                    kind = advisory.kind.as_str(),
                    error = %advisory,
                    fallback = ?self.fallback,
                    "Detection history unavailable, showing fallback"
                );
                HistoryLoad {
                    records: self.fallback_records(),
                    advisory: Some(advisory),
                    filter: TimeWindowFilter::All,
                    source: HistorySource::Fallback,
                }
            }
        }
    }

    async fn fetch(
        &self,
        token: Option<&SessionToken>,
    ) -> Result<Vec<HistoryRecord>, DetectionError> {
        let token = token.ok_or_else(DetectionError::unauthenticated)?;
        let reply = self.api.fetch_history(token).await.map_err(network_failure)?;
        check_status(&reply)?;
        self.records_from_body(&reply.body)
    }

    fn fallback_records(&self) -> Vec<HistoryRecord> {
        match self.fallback {
            HistoryFallback::Empty => Vec::new(),
            HistoryFallback::Sample => self
                .records_from_body(SAMPLE_HISTORY.as_bytes())
                .unwrap_or_default(),
        }
    }

    /// Parses a `{ data: [...] }` body. Items that cannot be read are skipped.
    pub fn records_from_body(&self, body: &[u8]) -> Result<Vec<HistoryRecord>, DetectionError> {
        let envelope: Envelope<Vec<Value>> = serde_json::from_slice(body).map_err(|e| {
            DetectionError::new(
                ErrorKind::ServerRejected,
                format!("Malformed history response: {}", e),
            )
        })?;
        if envelope.success == Some(false) {
            let message = envelope
                .message
                .unwrap_or_else(|| "The server refused to return the history".to_string());
            return Err(DetectionError::new(ErrorKind::ServerRejected, message));
        }

        let mut records: Vec<HistoryRecord> = envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<DetectionRecord>(item) {
                Ok(record) => match record.detected_at {
                    Some(detected_at) => Some(self.to_record(&record.to_domain(detected_at))),
                    None => {
                        warn!(id = %record.id, "History item without timestamp skipped");
                        None
                    }
                },
                Err(e) => {
                    warn!(error = %e, "Unreadable history item skipped");
                    None
                }
            })
            .collect();

        records.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        Ok(records)
    }

    /// Derives the history view of a detection, in this aggregator's time zone.
    pub fn to_record(&self, result: &DetectionResult) -> HistoryRecord {
        let classification = classify(result.accuracy, &result.status);
        let detected_at = result.detected_at.with_timezone(&self.zone);
        HistoryRecord {
            id: result.id.clone(),
            image_url: result.image_url.clone(),
            accuracy: result.accuracy,
            status: result.status.clone(),
            status_label: classification.status_label,
            disease_name: result.disease.as_ref().map(|d| d.name.clone()),
            detected_at,
            severity_tier: classification.tier,
            formatted_date: detected_at.format(DATE_FORMAT).to_string(),
            formatted_time: detected_at.format(TIME_FORMAT).to_string(),
        }
    }
}

/// Keeps the records inside `window`, computed on `now`'s calendar.
pub fn filter(
    records: &[HistoryRecord],
    window: TimeWindowFilter,
    now: DateTime<FixedOffset>,
) -> Vec<HistoryRecord> {
    let today = now.date_naive();
    let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
    let week_end = week_start + Duration::days(6);

    records
        .iter()
        .filter(|record| {
            let day = record.detected_at.with_timezone(now.offset()).date_naive();
            match window {
                TimeWindowFilter::All => true,
                TimeWindowFilter::Today => day == today,
                TimeWindowFilter::ThisWeek => day >= week_start && day <= week_end,
                TimeWindowFilter::ThisMonth => {
                    day.year() == today.year() && day.month() == today.month()
                }
            }
        })
        .cloned()
        .collect()
}

/// 1-indexed pagination. There is always at least one page; out-of-range pages are clamped.
pub fn paginate<T: Clone>(records: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
    let total_items = records.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let items = records
        .iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .cloned()
        .collect();

    Page {
        items,
        page,
        total_pages,
        total_items,
    }
}

/// Serializes `records` as they are, one row each, in order.
///
/// Fields are comma-joined without quoting, which is the format the backend tooling reads.
pub fn export_csv(records: &[HistoryRecord], now: DateTime<FixedOffset>) -> CsvExport {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADER.join(","));
    for record in records {
        let accuracy = format!("{:.1}%", record.accuracy);
        let row: [&str; 7] = [
            &record.id,
            record.result_label(),
            &accuracy,
            record.severity_tier.label(),
            &record.formatted_date,
            &record.formatted_time,
            &record.status_label,
        ];
        lines.push(row.join(","));
    }

    CsvExport {
        file_name: export_file_name(now),
        mime_type: CSV_MIME_TYPE,
        bytes: Bytes::from(lines.join("\n")),
    }
}

/// `riwayat-deteksi-<YYYY-MM-DD>.csv`
pub fn export_file_name(now: DateTime<FixedOffset>) -> String {
    format!("riwayat-deteksi-{}.csv", now.format("%Y-%m-%d"))
}

/// Exports either what the active filter shows or the whole loaded history.
pub fn export_view(
    records: &[HistoryRecord],
    window: TimeWindowFilter,
    scope: ExportScope,
    now: DateTime<FixedOffset>,
) -> CsvExport {
    match scope {
        ExportScope::Filtered => export_csv(&filter(records, window, now), now),
        ExportScope::All => export_csv(records, now),
    }
}
