use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use eventhub_core::{EntityKind, ExperienceId};
use eventhub_infra::CatalogStore;

use crate::app::{dto, errors, services::AppServices};

const LIST_FAILED: &str = "Error fetching experiences";
const CREATE_FAILED: &str = "Error creating experience";
const GET_FAILED: &str = "Error fetching experience";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_experiences).post(create_experience))
        .route("/:id", get(get_experience))
}

/// GET /experiences: newest first.
pub async fn list_experiences(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store.all_experiences().await {
        Ok(experiences) => (StatusCode::OK, Json(experiences)).into_response(),
        Err(e) => errors::store_error_to_response(e, LIST_FAILED),
    }
}

pub async fn create_experience(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::CreateExperienceRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.store.create_experience(body.into()).await {
        Ok(experience) => (StatusCode::CREATED, Json(experience)).into_response(),
        Err(e) => errors::store_error_to_response(e, CREATE_FAILED),
    }
}

pub async fn get_experience(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ExperienceId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store.get_experience(id).await {
        Ok(Some(row)) => (StatusCode::OK, Json(dto::ExperienceDetail::from(row))).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            format!("{} not found", EntityKind::Experience),
        ),
        Err(e) => errors::store_error_to_response(e, GET_FAILED),
    }
}
