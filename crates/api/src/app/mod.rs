//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and the report service
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: query/body DTOs and their mapping onto domain inputs
//! - `errors.rs`: consistent `{"error": ...}` responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: AppServices) -> Router {
    let services = Arc::new(services);

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .layer(Extension(services)),
        )
}
