use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};

use eventhub_core::{AttendeeId, EventId};
use eventhub_infra::CatalogStore;

use crate::app::{dto, errors, services::AppServices};

const LIST_FAILED: &str = "Error fetching attendees";
const CREATE_FAILED: &str = "Error registering attendee";
const DELETE_FAILED: &str = "Error removing attendee";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_attendees).post(register_attendee))
        .route("/:id", delete(remove_attendee))
}

/// GET /attendees?eventId=<uuid>: attendees of one event, oldest first.
pub async fn list_attendees(
    Extension(services): Extension<Arc<AppServices>>,
    query: Option<Query<dto::QueryPairs>>,
) -> axum::response::Response {
    let raw = query
        .and_then(|Query(pairs)| dto::AttendeeListQuery::from_pairs(&pairs).event_id)
        .unwrap_or_default();
    if raw.trim().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "eventId is required");
    }
    let event_id: EventId = match dto::parse_id(&raw) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store.attendees_for_event(event_id).await {
        Ok(attendees) => (StatusCode::OK, Json(attendees)).into_response(),
        Err(e) => errors::store_error_to_response(e, LIST_FAILED),
    }
}

pub async fn register_attendee(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::CreateAttendeeRequest>, JsonRejection>,
) -> axum::response::Response {
    let input = match dto::body(payload).and_then(dto::CreateAttendeeRequest::into_input) {
        Ok(input) => input,
        Err(resp) => return resp,
    };

    match services.store.add_attendee(input).await {
        Ok(attendee) => (StatusCode::CREATED, Json(attendee)).into_response(),
        Err(e) => errors::store_error_to_response(e, CREATE_FAILED),
    }
}

pub async fn remove_attendee(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: AttendeeId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store.remove_attendee(id).await {
        Ok(()) => (StatusCode::OK, Json(dto::Deleted::new(id))).into_response(),
        Err(e) => errors::store_error_to_response(e, DELETE_FAILED),
    }
}
