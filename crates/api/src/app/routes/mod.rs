use axum::{routing::post, Router};

pub mod attendees;
pub mod events;
pub mod experiences;
pub mod ratings;
pub mod reports;
pub mod system;

/// Router for every resource endpoint (everything except `/health`).
pub fn router() -> Router {
    Router::new()
        .nest("/reports", reports::router())
        .nest("/events", events::router())
        .nest("/attendees", attendees::router())
        .nest("/experiences", experiences::router())
        .route("/event-ratings", post(ratings::rate_event))
        .route("/experience-ratings", post(ratings::rate_experience))
}
