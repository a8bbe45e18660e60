//! HTTP API — shared state and the merged router.

use std::sync::Arc;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::campaigns::Dispatcher;
use crate::campaigns::routes::campaign_routes;
use crate::contacts::routes::contact_routes;
use crate::sheets::SpreadsheetSource;
use crate::sheets::routes::sheet_routes;
use crate::store::Database;
use crate::templates::routes::template_routes;

/// Shared state for all API routes.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub dispatcher: Arc<Dispatcher>,
    pub sheets: Arc<dyn SpreadsheetSource>,
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "campaign-dispatch"
    }))
}

/// Build the full API router.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(campaign_routes(state.clone()))
        .merge(contact_routes(state.clone()))
        .merge(template_routes(state.clone()))
        .merge(sheet_routes(state))
        .layer(CorsLayer::permissive())
}
