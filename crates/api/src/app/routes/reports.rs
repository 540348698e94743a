//! Report endpoints.
//!
//! Query parameters are parsed leniently: malformed values fall back to their
//! defaults and never fail the request. A repeated key keeps its first value.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::app::{dto, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/events", get(events_report))
        .route("/experiences", get(experiences_report))
        .route("/summary", get(summary_report))
}

/// GET /reports/events?limit=10&offset=0&sortBy=rating&sortOrder=desc
///
/// - `sortBy`: `date` (default), `rating` or `attendees`
/// - `sortOrder`: `asc` or `desc` (default)
pub async fn events_report(
    Extension(services): Extension<Arc<AppServices>>,
    query: Option<Query<dto::QueryPairs>>,
) -> axum::response::Response {
    let query = query
        .map(|Query(pairs)| dto::ReportPageQuery::from_pairs(&pairs))
        .unwrap_or_default();
    let page = query.page(services.report_max_limit);

    match services.reports.events_report(query.event_order(), page).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::store_error_to_response(e, errors::EVENTS_REPORT_FAILED),
    }
}

/// GET /reports/experiences?limit=10&offset=0&sortBy=rating&sortOrder=desc
///
/// - `sortBy`: `rating` (default) or `date`
pub async fn experiences_report(
    Extension(services): Extension<Arc<AppServices>>,
    query: Option<Query<dto::QueryPairs>>,
) -> axum::response::Response {
    let query = query
        .map(|Query(pairs)| dto::ReportPageQuery::from_pairs(&pairs))
        .unwrap_or_default();
    let page = query.page(services.report_max_limit);

    match services
        .reports
        .experiences_report(query.experience_order(), page)
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::store_error_to_response(e, errors::EXPERIENCES_REPORT_FAILED),
    }
}

/// GET /reports/summary?period=month
///
/// `period` is `all` (default), `month` or `year`.
pub async fn summary_report(
    Extension(services): Extension<Arc<AppServices>>,
    query: Option<Query<dto::QueryPairs>>,
) -> axum::response::Response {
    let period = query
        .map(|Query(pairs)| dto::SummaryQuery::from_pairs(&pairs).period())
        .unwrap_or_default();

    match services.reports.summary(period).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => errors::store_error_to_response(e, errors::SUMMARY_FAILED),
    }
}
