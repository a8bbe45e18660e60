//! REST endpoints for contacts.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get};
use serde::Deserialize;
use uuid::Uuid;

use super::model::{Contact, NewContact};
use crate::error::{ApiResult, Error};
use crate::extract::{Json, Path, Query};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactFilter {
    source_id: Option<String>,
}

/// GET /api/contacts?sourceId=
async fn list_contacts(
    State(state): State<AppState>,
    Query(filter): Query<ContactFilter>,
) -> ApiResult<Json<Vec<Contact>>> {
    let contacts = state.db.list_contacts(filter.source_id.as_deref()).await?;
    Ok(Json(contacts))
}

/// POST /api/contacts
async fn create_contact(
    State(state): State<AppState>,
    Json(body): Json<NewContact>,
) -> ApiResult<(StatusCode, Json<Contact>)> {
    let contact = body.validate()?.into_contact();
    state.db.insert_contact(&contact).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

/// DELETE /api/contacts/{id}
async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.db.delete_contact(id).await? {
        return Err(Error::not_found("Contact", id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Build the contact REST routes.
pub fn contact_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route("/api/contacts/{id}", delete(delete_contact))
        .with_state(state)
}
