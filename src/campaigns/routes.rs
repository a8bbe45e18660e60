//! REST endpoints for campaigns, their recipients, dispatch, and stats.

use std::collections::HashSet;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::dispatch::DispatchReport;
use super::model::{Campaign, CampaignContact, CampaignStatus, CampaignUpdate, NewCampaign};
use super::personalize::render_message;
use super::state::{CampaignAction, invalid_state};
use super::stats::{CampaignStats, summarize};
use crate::error::{ApiResult, Error, Result};
use crate::extract::{Json, Path, Query};
use crate::server::AppState;
use crate::store::Database;
use crate::transport::OutgoingEmail;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleRequest {
    scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrollRequest {
    contact_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreviewQuery {
    contact_id: Uuid,
}

async fn load_campaign(db: &dyn Database, id: Uuid) -> Result<Campaign> {
    db.get_campaign(id)
        .await?
        .ok_or_else(|| Error::not_found("Campaign", id))
}

/// Explain why a conditional write touched no row: gone, or wrong status.
async fn refused(db: &dyn Database, id: Uuid, action: &str) -> Error {
    match load_campaign(db, id).await {
        Ok(campaign) => invalid_state(id, campaign.status, action),
        Err(e) => e,
    }
}

/// GET /api/campaigns
async fn list_campaigns(State(state): State<AppState>) -> ApiResult<Json<Vec<Campaign>>> {
    Ok(Json(state.db.list_campaigns().await?))
}

/// POST /api/campaigns
async fn create_campaign(
    State(state): State<AppState>,
    Json(body): Json<NewCampaign>,
) -> ApiResult<(StatusCode, Json<Campaign>)> {
    body.validate()?;
    let campaign = body.into_campaign();
    state.db.insert_campaign(&campaign).await?;
    tracing::info!(campaign_id = %campaign.id, name = %campaign.name, "Campaign created");
    Ok((StatusCode::CREATED, Json(campaign)))
}

/// GET /api/campaigns/{id}
async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Campaign>> {
    Ok(Json(load_campaign(state.db.as_ref(), id).await?))
}

/// PATCH /api/campaigns/{id}
///
/// Content fields only; refused while the campaign is sending.
async fn update_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<CampaignUpdate>,
) -> ApiResult<Json<Campaign>> {
    let db = state.db.as_ref();
    let mut campaign = load_campaign(db, id).await?;
    if campaign.status == CampaignStatus::Sending {
        return Err(invalid_state(id, campaign.status, "edit").into());
    }
    update.validate()?;
    if update.is_empty() {
        return Ok(Json(campaign));
    }

    update.apply_to(&mut campaign);
    if !db.update_campaign(&campaign).await? {
        return Err(refused(db, id, "edit").await.into());
    }
    Ok(Json(campaign))
}

/// DELETE /api/campaigns/{id}
async fn delete_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let db = state.db.as_ref();
    let campaign = load_campaign(db, id).await?;
    if campaign.status == CampaignStatus::Sending {
        return Err(invalid_state(id, campaign.status, "delete").into());
    }
    if !db.delete_campaign(id).await? {
        return Err(refused(db, id, "delete").await.into());
    }
    tracing::info!(campaign_id = %id, "Campaign deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/campaigns/{id}/send
async fn send_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DispatchReport>> {
    Ok(Json(state.dispatcher.send_campaign(id).await?))
}

/// POST /api/campaigns/{id}/schedule
///
/// Records `scheduledAt` only; nothing executes the send later.
async fn schedule_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ScheduleRequest>,
) -> ApiResult<Json<Campaign>> {
    let db = state.db.as_ref();
    let campaign = load_campaign(db, id).await?;
    campaign.status.apply(id, CampaignAction::Schedule)?;

    if !db.schedule_campaign(id, body.scheduled_at).await? {
        return Err(refused(db, id, CampaignAction::Schedule.as_str()).await.into());
    }
    Ok(Json(load_campaign(db, id).await?))
}

/// POST /api/campaigns/{id}/pause
async fn pause_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Campaign>> {
    let db = state.db.as_ref();
    let campaign = load_campaign(db, id).await?;
    campaign.status.apply(id, CampaignAction::Pause)?;

    if !db.pause_campaign(id).await? {
        return Err(refused(db, id, CampaignAction::Pause.as_str()).await.into());
    }
    tracing::info!(campaign_id = %id, "Campaign paused");
    Ok(Json(load_campaign(db, id).await?))
}

/// GET /api/campaigns/{id}/recipients
async fn list_recipients(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<CampaignContact>>> {
    let db = state.db.as_ref();
    load_campaign(db, id).await?;
    Ok(Json(db.list_campaign_contacts(id).await?))
}

/// POST /api/campaigns/{id}/recipients
///
/// Enrolls each listed contact once; contacts already enrolled are skipped.
async fn enroll_recipients(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<EnrollRequest>,
) -> ApiResult<(StatusCode, Json<Vec<CampaignContact>>)> {
    let db = state.db.as_ref();
    let campaign = load_campaign(db, id).await?;
    if !campaign.status.is_sendable() {
        return Err(invalid_state(id, campaign.status, "enroll recipients").into());
    }

    for contact_id in &body.contact_ids {
        if db.get_contact(*contact_id).await?.is_none() {
            return Err(Error::not_found("Contact", contact_id).into());
        }
    }

    let mut seen: HashSet<Uuid> = db
        .list_campaign_contacts(id)
        .await?
        .into_iter()
        .map(|r| r.contact_id)
        .collect();
    let fresh: Vec<Uuid> = body
        .contact_ids
        .into_iter()
        .filter(|contact_id| seen.insert(*contact_id))
        .collect();

    let enrolled = db.enroll_contacts(id, &fresh).await?;
    tracing::info!(campaign_id = %id, enrolled = enrolled.len(), "Recipients enrolled");
    Ok((StatusCode::CREATED, Json(enrolled)))
}

/// GET /api/campaigns/{id}/preview?contactId=
async fn preview_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<Json<OutgoingEmail>> {
    let db = state.db.as_ref();
    let campaign = load_campaign(db, id).await?;
    let contact = db
        .get_contact(query.contact_id)
        .await?
        .ok_or_else(|| Error::not_found("Contact", query.contact_id))?;
    Ok(Json(render_message(&campaign, &contact)))
}

/// GET /api/stats
async fn stats(State(state): State<AppState>) -> ApiResult<Json<CampaignStats>> {
    let campaigns = state.db.list_campaigns().await?;
    Ok(Json(summarize(&campaigns)))
}

/// Build the campaign REST routes.
pub fn campaign_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/campaigns", get(list_campaigns).post(create_campaign))
        .route(
            "/api/campaigns/{id}",
            get(get_campaign)
                .patch(update_campaign)
                .delete(delete_campaign),
        )
        .route("/api/campaigns/{id}/send", post(send_campaign))
        .route("/api/campaigns/{id}/schedule", post(schedule_campaign))
        .route("/api/campaigns/{id}/pause", post(pause_campaign))
        .route(
            "/api/campaigns/{id}/recipients",
            get(list_recipients).post(enroll_recipients),
        )
        .route("/api/campaigns/{id}/preview", get(preview_campaign))
        .route("/api/stats", get(stats))
        .with_state(state)
}
