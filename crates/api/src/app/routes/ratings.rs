//! Rating submission. Ratings are whole numbers from 1 to 5.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use eventhub_infra::CatalogStore;

use crate::app::{dto, errors, services::AppServices};

const RATE_EVENT_FAILED: &str = "Error saving event rating";
const RATE_EXPERIENCE_FAILED: &str = "Error saving experience rating";

/// POST /event-ratings `{"eventId": "...", "rating": 4}`
pub async fn rate_event(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::RateEventRequest>, JsonRejection>,
) -> axum::response::Response {
    let (event_id, rating) = match dto::body(payload).and_then(|b| b.parse()) {
        Ok(parsed) => parsed,
        Err(resp) => return resp,
    };

    match services.store.rate_event(event_id, rating).await {
        Ok(row) => (StatusCode::CREATED, Json(row)).into_response(),
        Err(e) => errors::store_error_to_response(e, RATE_EVENT_FAILED),
    }
}

/// POST /experience-ratings `{"experienceId": "...", "rating": 4}`
pub async fn rate_experience(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::RateExperienceRequest>, JsonRejection>,
) -> axum::response::Response {
    let (experience_id, rating) = match dto::body(payload).and_then(|b| b.parse()) {
        Ok(parsed) => parsed,
        Err(resp) => return resp,
    };

    match services.store.rate_experience(experience_id, rating).await {
        Ok(row) => (StatusCode::CREATED, Json(row)).into_response(),
        Err(e) => errors::store_error_to_response(e, RATE_EXPERIENCE_FAILED),
    }
}
