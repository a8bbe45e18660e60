//! REST endpoints for browsing and importing from spreadsheets.

use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};

use super::{DEFAULT_RANGE, Grid, SpreadsheetInfo};
use crate::contacts::{ImportRequest, ImportSummary, import_from_source};
use crate::error::{ApiResult, Error};
use crate::extract::{Json, Path, Query};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
struct RangeQuery {
    range: Option<String>,
}

/// Grid as returned to the UI.
#[derive(Debug, Serialize)]
struct SheetData {
    id: String,
    range: String,
    values: Grid,
}

/// GET /api/sheets/{sourceId}?range=
async fn get_sheet(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<SheetData>> {
    let range = query.range.unwrap_or_else(|| DEFAULT_RANGE.to_string());
    let values = state
        .sheets
        .fetch_grid(&source_id, &range)
        .await?
        .ok_or_else(|| Error::not_found("Spreadsheet", &source_id))?;
    Ok(Json(SheetData {
        id: source_id,
        range,
        values,
    }))
}

/// GET /api/sheets/{sourceId}/info
async fn get_sheet_info(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
) -> ApiResult<Json<SpreadsheetInfo>> {
    let info = state
        .sheets
        .fetch_metadata(&source_id)
        .await?
        .ok_or_else(|| Error::not_found("Spreadsheet", &source_id))?;
    Ok(Json(info))
}

/// POST /api/sheets/{sourceId}/import
///
/// Replaces every contact previously imported from this source.
async fn import_sheet(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<ImportSummary>> {
    let summary =
        import_from_source(state.db.as_ref(), state.sheets.as_ref(), &source_id, &request).await?;
    Ok(Json(summary))
}

/// Build the spreadsheet REST routes.
pub fn sheet_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/sheets/{source_id}", get(get_sheet))
        .route("/api/sheets/{source_id}/info", get(get_sheet_info))
        .route("/api/sheets/{source_id}/import", post(import_sheet))
        .with_state(state)
}
