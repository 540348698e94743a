use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use eventhub_core::{EntityKind, EventId};
use eventhub_infra::CatalogStore;

use crate::app::{dto, errors, services::AppServices};

const LIST_FAILED: &str = "Error fetching events";
const CREATE_FAILED: &str = "Error creating event";
const GET_FAILED: &str = "Error fetching event";
const UPDATE_FAILED: &str = "Error updating event";
const DELETE_FAILED: &str = "Error deleting event";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route("/:id", get(get_event).put(update_event).delete(delete_event))
}

/// GET /events: every event, latest event date first.
pub async fn list_events(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.store.all_events().await {
        Ok(events) => (StatusCode::OK, Json(events)).into_response(),
        Err(e) => errors::store_error_to_response(e, LIST_FAILED),
    }
}

pub async fn create_event(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::CreateEventRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.store.create_event(body.into()).await {
        Ok(event) => {
            tracing::info!(event_id = %event.id, "event created");
            (StatusCode::CREATED, Json(event)).into_response()
        }
        Err(e) => errors::store_error_to_response(e, CREATE_FAILED),
    }
}

/// GET /events/:id: the event with its attendees and ratings.
pub async fn get_event(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: EventId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store.get_event(id).await {
        Ok(Some(row)) => (StatusCode::OK, Json(dto::EventDetail::from(row))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, format!("{} not found", EntityKind::Event)),
        Err(e) => errors::store_error_to_response(e, GET_FAILED),
    }
}

/// PUT /events/:id: partial update; absent fields are left unchanged.
pub async fn update_event(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<dto::UpdateEventRequest>, JsonRejection>,
) -> axum::response::Response {
    let id: EventId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.store.update_event(id, body.into()).await {
        Ok(event) => (StatusCode::OK, Json(event)).into_response(),
        Err(e) => errors::store_error_to_response(e, UPDATE_FAILED),
    }
}

/// DELETE /events/:id: also removes the event's attendees and ratings.
pub async fn delete_event(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: EventId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store.delete_event(id).await {
        Ok(()) => {
            tracing::info!(event_id = %id, "event deleted");
            (StatusCode::OK, Json(dto::Deleted::new(id))).into_response()
        }
        Err(e) => errors::store_error_to_response(e, DELETE_FAILED),
    }
}
