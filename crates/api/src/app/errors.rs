use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use eventhub_core::DomainError;
use eventhub_infra::StoreError;

pub const EVENTS_REPORT_FAILED: &str = "Error fetching events report";
pub const EXPERIENCES_REPORT_FAILED: &str = "Error fetching experiences report";
pub const SUMMARY_FAILED: &str = "Error generating report summary";

/// Map a store error to a response.
///
/// Backend failures are logged in full and answered with `failure_message`
/// only.
pub fn store_error_to_response(err: StoreError, failure_message: &'static str) -> axum::response::Response {
    match err {
        StoreError::NotFound { kind, .. } => json_error(StatusCode::NOT_FOUND, format!("{kind} not found")),
        StoreError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, msg),
        err @ StoreError::Backend { .. } => {
            tracing::error!(error = %err, "{failure_message}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, failure_message)
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, err.to_string())
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, axum::Json(json!({ "error": message.into() }))).into_response()
}
