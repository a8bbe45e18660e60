//! REST endpoints for reusable email templates.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use uuid::Uuid;

use super::model::{EmailTemplate, NewTemplate, TemplateUpdate};
use crate::error::{ApiResult, Error};
use crate::extract::{Json, Path};
use crate::server::AppState;

/// GET /api/templates
async fn list_templates(State(state): State<AppState>) -> ApiResult<Json<Vec<EmailTemplate>>> {
    Ok(Json(state.db.list_templates().await?))
}

/// POST /api/templates
async fn create_template(
    State(state): State<AppState>,
    Json(body): Json<NewTemplate>,
) -> ApiResult<(StatusCode, Json<EmailTemplate>)> {
    body.validate()?;
    let template = body.into_template();
    state.db.insert_template(&template).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// PATCH /api/templates/{id}
async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<TemplateUpdate>,
) -> ApiResult<Json<EmailTemplate>> {
    let mut template = state
        .db
        .get_template(id)
        .await?
        .ok_or_else(|| Error::not_found("Template", id))?;
    update.validate()?;
    update.apply_to(&mut template);

    if !state.db.update_template(&template).await? {
        return Err(Error::not_found("Template", id).into());
    }
    Ok(Json(template))
}

/// DELETE /api/templates/{id}
async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.db.delete_template(id).await? {
        return Err(Error::not_found("Template", id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Build the template REST routes.
pub fn template_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/templates", get(list_templates).post(create_template))
        .route(
            "/api/templates/{id}",
            patch(update_template).delete(delete_template),
        )
        .with_state(state)
}
