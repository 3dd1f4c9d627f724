//! services/frontend/src/web/history.rs
//!
//! Handlers for the history view: one page of records and the CSV export.

use crate::error::ViewError;
use crate::web::middleware::SessionContext;
use crate::web::protocol::{ErrorBody, HistoryPageResponse};
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::{header, HeaderName},
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, FixedOffset, Utc};
use leafscan_core::domain::DEFAULT_PAGE_SIZE;
use leafscan_core::history::{export_view, filter, paginate};
use leafscan_core::{ExportScope, TimeWindowFilter};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::IntoParams;

/// Tells the client whether the rows came from the backend or the fallback set.
const HISTORY_SOURCE_HEADER: &str = "x-history-source";

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// `all` (default), `today`, `week` or `month`.
    pub window: Option<String>,
    /// 1-indexed; out-of-range pages are clamped.
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// `all` (default), `today`, `week` or `month`.
    pub window: Option<String>,
    /// `filtered` (default) exports what the window shows; `all` ignores it.
    #[param(value_type = Option<String>)]
    pub scope: Option<ExportScope>,
}

fn parse_window(raw: Option<&str>) -> Result<TimeWindowFilter, ViewError> {
    raw.unwrap_or_default()
        .parse::<TimeWindowFilter>()
        .map_err(ViewError::BadRequest)
}

fn now_in(zone: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&zone)
}

/// One page of the detection history.
///
/// A backend failure falls back to the configured sample set and is reported in `advisory`.
#[utoipa::path(
    get,
    path = "/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "A history page", body = HistoryPageResponse),
        (status = 400, description = "Unknown time window", body = ErrorBody)
    )
)]
pub async fn get_history_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPageResponse>, ViewError> {
    let window = parse_window(query.window.as_deref())?;
    let load = app_state.history.load(session.token()).await;

    let now = now_in(app_state.history.zone());
    let visible = filter(&load.records, window, now);
    let page = paginate(
        &visible,
        query.page.unwrap_or(1),
        query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    );
    Ok(Json(HistoryPageResponse::new(page, window, &load)))
}

/// Download the history as CSV.
#[utoipa::path(
    get,
    path = "/history/export",
    params(ExportQuery),
    responses(
        (status = 200, description = "`riwayat-deteksi-<date>.csv`", content_type = "text/csv"),
        (status = 400, description = "Unknown time window or scope", body = ErrorBody)
    )
)]
pub async fn export_history_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ViewError> {
    let window = parse_window(query.window.as_deref())?;
    let scope = query.scope.unwrap_or_default();
    let load = app_state.history.load(session.token()).await;

    let export = export_view(&load.records, window, scope, now_in(app_state.history.zone()));
    info!(
        file_name = %export.file_name,
        window = window.as_str(),
        scope = ?scope,
        source = load.source.as_str(),
        "History exported"
    );

    Ok((
        [
            (header::CONTENT_TYPE, format!("{}; charset=utf-8", export.mime_type)),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.file_name),
            ),
            (
                HeaderName::from_static(HISTORY_SOURCE_HEADER),
                load.source.as_str().to_string(),
            ),
        ],
        export.bytes,
    ))
}
