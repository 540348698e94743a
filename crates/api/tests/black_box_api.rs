use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use eventhub_api::app::services::AppServices;
use eventhub_core::{
    Attendee, AttendeeId, EntityKind, Event, EventId, EventPatch, EventRating, EventWithRelations,
    Experience, ExperienceId, ExperienceOrderSpec, ExperienceRating, ExperienceWithRatings,
    NewAttendee, NewEvent, NewExperience, OrderSpec, PageRequest, RatedKind, RatingTally,
    RatingValue,
};
use eventhub_infra::{CatalogStore, InMemoryStore, ReportStore, StoreError, StoreResult};
use reqwest::StatusCode;
use serde_json::{json, Value};

const BACKEND_DETAIL: &str = "connection refused";

/// Store whose backend is unreachable: every call fails.
struct UnreachableStore;

fn unavailable<T>(operation: &'static str) -> StoreResult<T> {
    Err(StoreError::backend(operation, BACKEND_DETAIL))
}

#[async_trait]
impl ReportStore for UnreachableStore {
    async fn list_events(&self, _: OrderSpec, _: PageRequest) -> StoreResult<Vec<EventWithRelations>> {
        unavailable("list_events")
    }

    async fn list_experiences(
        &self,
        _: ExperienceOrderSpec,
        _: PageRequest,
    ) -> StoreResult<Vec<ExperienceWithRatings>> {
        unavailable("list_experiences")
    }

    async fn count_matching(&self, _: EntityKind, _: Option<DateTime<Utc>>) -> StoreResult<u64> {
        unavailable("count_matching")
    }

    async fn rating_tally(&self, _: RatedKind) -> StoreResult<RatingTally> {
        unavailable("rating_tally")
    }
}

#[async_trait]
impl CatalogStore for UnreachableStore {
    async fn create_event(&self, _: NewEvent) -> StoreResult<Event> {
        unavailable("create_event")
    }

    async fn all_events(&self) -> StoreResult<Vec<Event>> {
        unavailable("all_events")
    }

    async fn get_event(&self, _: EventId) -> StoreResult<Option<EventWithRelations>> {
        unavailable("get_event")
    }

    async fn update_event(&self, _: EventId, _: EventPatch) -> StoreResult<Event> {
        unavailable("update_event")
    }

    async fn delete_event(&self, _: EventId) -> StoreResult<()> {
        unavailable("delete_event")
    }

    async fn add_attendee(&self, _: NewAttendee) -> StoreResult<Attendee> {
        unavailable("add_attendee")
    }

    async fn attendees_for_event(&self, _: EventId) -> StoreResult<Vec<Attendee>> {
        unavailable("attendees_for_event")
    }

    async fn remove_attendee(&self, _: AttendeeId) -> StoreResult<()> {
        unavailable("remove_attendee")
    }

    async fn create_experience(&self, _: NewExperience) -> StoreResult<Experience> {
        unavailable("create_experience")
    }

    async fn all_experiences(&self) -> StoreResult<Vec<Experience>> {
        unavailable("all_experiences")
    }

    async fn get_experience(&self, _: ExperienceId) -> StoreResult<Option<ExperienceWithRatings>> {
        unavailable("get_experience")
    }

    async fn rate_event(&self, _: EventId, _: RatingValue) -> StoreResult<EventRating> {
        unavailable("rate_event")
    }

    async fn rate_experience(&self, _: ExperienceId, _: RatingValue) -> StoreResult<ExperienceRating> {
        unavailable("rate_experience")
    }
}

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(AppServices::in_memory(1000)).await
    }

    async fn spawn_with(services: AppServices) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = eventhub_api::app::build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn create_event(&self, name: &str, date: &str) -> String {
        let (status, body) = self
            .post(
                "/events",
                json!({ "name": name, "date": date, "place": "Community Hall", "description": "" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn rate_event(&self, event_id: &str, rating: i64) {
        let (status, body) = self
            .post("/event-ratings", json!({ "eventId": event_id, "rating": rating }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    async fn add_attendee(&self, event_id: &str, name: &str) -> String {
        let (status, body) = self
            .post("/attendees", json!({ "eventId": event_id, "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_experience(&self, title: &str) -> String {
        let (status, body) = self
            .post("/experiences", json!({ "title": title, "description": "worth it" }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn rate_experience(&self, experience_id: &str, rating: i64) {
        let (status, body) = self
            .post(
                "/experience-ratings",
                json!({ "experienceId": experience_id, "rating": rating }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    /// Events A [5,5], B [4], C unrated with one attendee.
    async fn seed_three_events(&self) -> [String; 3] {
        let a = self.create_event("A", "2026-04-01T18:00:00Z").await;
        let b = self.create_event("B", "2026-04-02T18:00:00Z").await;
        let c = self.create_event("C", "2026-04-03T18:00:00Z").await;
        self.rate_event(&a, 5).await;
        self.rate_event(&a, 5).await;
        self.rate_event(&b, 4).await;
        self.add_attendee(&c, "Robin").await;
        [a, b, c]
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn names(report: &Value, key: &str, field: &str) -> Vec<String> {
    report[key]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row[field].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn events_report_sorted_by_rating() {
    let srv = TestServer::spawn().await;
    srv.seed_three_events().await;

    let (status, report) = srv
        .get("/reports/events?sortBy=rating&sortOrder=desc&limit=10&offset=0")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&report, "events", "name"), ["A", "B", "C"]);

    let averages: Vec<f64> = report["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["averageRating"].as_f64().unwrap())
        .collect();
    assert_eq!(averages, [5.0, 4.0, 0.0]);
    assert_eq!(report["events"][0]["ratingCount"], 2);
    assert_eq!(report["events"][2]["attendeeCount"], 1);
    assert_eq!(
        report["pagination"],
        json!({ "total": 3, "limit": 10, "offset": 0, "hasMore": false })
    );

    let (_, ascending) = srv.get("/reports/events?sortBy=rating&sortOrder=asc").await;
    assert_eq!(names(&ascending, "events", "name"), ["C", "B", "A"]);

    let (_, by_attendees) = srv.get("/reports/events?sortBy=attendees").await;
    assert_eq!(by_attendees["events"][0]["name"], "C");
}

#[tokio::test]
async fn events_report_defaults_to_date_desc() {
    let srv = TestServer::spawn().await;
    srv.seed_three_events().await;

    let (_, plain) = srv.get("/reports/events").await;
    assert_eq!(names(&plain, "events", "name"), ["C", "B", "A"]);

    let (status, unknown) = srv.get("/reports/events?sortBy=popularity&sortOrder=sideways").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&unknown, "events", "name"), ["C", "B", "A"]);
}

#[tokio::test]
async fn pagination_window_and_has_more() {
    let srv = TestServer::spawn().await;
    srv.seed_three_events().await;

    let (_, first) = srv.get("/reports/events?limit=2&offset=0").await;
    assert_eq!(first["events"].as_array().unwrap().len(), 2);
    assert_eq!(first["pagination"]["total"], 3);
    assert_eq!(first["pagination"]["hasMore"], true);

    let (_, second) = srv.get("/reports/events?limit=2&offset=2").await;
    assert_eq!(second["events"].as_array().unwrap().len(), 1);
    assert_eq!(second["pagination"]["hasMore"], false);

    let (_, beyond) = srv.get("/reports/events?offset=50").await;
    assert!(beyond["events"].as_array().unwrap().is_empty());
    assert_eq!(beyond["pagination"]["total"], 3);
}

#[tokio::test]
async fn malformed_paging_values_fall_back() {
    let srv = TestServer::spawn_with(AppServices::in_memory(2)).await;
    srv.seed_three_events().await;

    let (status, report) = srv.get("/reports/events?limit=abc&offset=-4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["pagination"]["limit"], 2);
    assert_eq!(report["pagination"]["offset"], 0);

    let (_, capped) = srv.get("/reports/events?limit=500").await;
    assert_eq!(capped["pagination"]["limit"], 2);
    assert_eq!(capped["events"].as_array().unwrap().len(), 2);

    let (_, leading) = srv.get("/reports/events?limit=1xyz").await;
    assert_eq!(leading["pagination"]["limit"], 1);
}

#[tokio::test]
async fn repeated_query_keys_keep_the_first_value() {
    let srv = TestServer::spawn().await;
    let [_, _, c] = srv.seed_three_events().await;

    let (status, report) = srv
        .get("/reports/events?limit=1&sortBy=rating&sortOrder=asc&sortOrder=desc&limit=50")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&report, "events", "name"), ["C"]);
    assert_eq!(report["pagination"]["limit"], 1);
    assert_eq!(report["pagination"]["hasMore"], true);

    let (_, summary) = srv.get("/reports/summary?period=year&period=month").await;
    assert_eq!(summary["period"], "year");

    let (status, attendees) = srv
        .get(&format!("/attendees?eventId={c}&eventId=not-an-id"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(attendees.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn experiences_report_defaults_to_rating() {
    let srv = TestServer::spawn().await;
    let first = srv.create_experience("first").await;
    let second = srv.create_experience("second").await;
    srv.rate_experience(&first, 2).await;
    srv.rate_experience(&second, 5).await;
    srv.rate_experience(&second, 4).await;

    let (status, report) = srv.get("/reports/experiences").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&report, "experiences", "title"), ["second", "first"]);
    assert_eq!(report["experiences"][0]["averageRating"], 4.5);
    assert_eq!(report["experiences"][0]["ratingCount"], 2);
    assert!(report["experiences"][0].get("attendeeCount").is_none());
    assert_eq!(report["pagination"]["total"], 2);

    let (_, by_date) = srv.get("/reports/experiences?sortBy=date&sortOrder=asc").await;
    assert_eq!(by_date["experiences"][0]["id"], first);
}

#[tokio::test]
async fn summary_reports_totals_and_averages() {
    let srv = TestServer::spawn().await;
    srv.seed_three_events().await;
    let x = srv.create_experience("x").await;
    srv.rate_experience(&x, 1).await;

    let (status, summary) = srv.get("/reports/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["totalEvents"], 3);
    assert_eq!(summary["eventsThisPeriod"], 3);
    assert_eq!(summary["totalAttendees"], 1);
    assert_eq!(summary["totalExperiences"], 1);
    // events: 14/3, experiences: 1; overall (14/3 + 1) / 2 = 2.833..
    assert_eq!(summary["averageEventRating"], 4.7);
    assert_eq!(summary["averageExperienceRating"], 1.0);
    assert_eq!(summary["averageRating"], 2.8);
    assert_eq!(summary["period"], "all");

    let generated = summary["generatedAt"].as_str().unwrap();
    let generated = chrono::DateTime::parse_from_rfc3339(generated).unwrap();
    assert!((Utc::now() - generated.with_timezone(&Utc)).num_seconds().abs() < 60);
}

#[tokio::test]
async fn summary_period_scopes_counts_and_unknown_period_means_all() {
    let store = Arc::new(InMemoryStore::new());
    let long_ago = Utc::now() - ChronoDuration::days(800);
    store
        .seed_event(Event {
            id: EventId::new(),
            name: "Archive night".into(),
            date: long_ago,
            place: "Museum".into(),
            description: String::new(),
            image_url: None,
            created_at: long_ago,
            updated_at: long_ago,
        })
        .unwrap();
    let srv = TestServer::spawn_with(AppServices::new(store, 1000)).await;
    srv.create_event("Fresh", "2026-11-01T10:00:00Z").await;

    for period in ["month", "year"] {
        let (_, summary) = srv.get(&format!("/reports/summary?period={period}")).await;
        assert_eq!(summary["period"], period);
        assert_eq!(summary["totalEvents"], 2);
        assert_eq!(summary["eventsThisPeriod"], 1);
    }

    let (status, fallback) = srv.get("/reports/summary?period=fortnight").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fallback["period"], "all");
    assert_eq!(fallback["eventsThisPeriod"], 2);
}

#[tokio::test]
async fn ratings_are_validated() {
    let srv = TestServer::spawn().await;
    let event = srv.create_event("Quiz", "2026-05-05T19:00:00Z").await;

    for rating in [0, 6, -1] {
        let (status, body) = srv
            .post("/event-ratings", json!({ "eventId": event, "rating": rating }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    let (status, _) = srv
        .post("/event-ratings", json!({ "eventId": EventId::new().to_string(), "rating": 3 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = srv
        .post("/experience-ratings", json!({ "experienceId": "not-a-uuid", "rating": 3 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, report) = srv.get("/reports/events").await;
    assert_eq!(report["events"][0]["ratingCount"], 0);
}

#[tokio::test]
async fn write_path_validation_and_not_found() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv
        .post(
            "/events",
            json!({ "name": "   ", "date": "2026-05-05T19:00:00Z", "place": "Park" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("name"));

    let (status, body) = srv.post("/events", json!({ "name": "No date" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = srv.get("/events/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = srv.get(&format!("/events/{}", EventId::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = srv
        .post("/attendees", json!({ "eventId": EventId::new().to_string(), "name": "Ghost" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = srv.get("/attendees").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn event_lifecycle_and_cascade() {
    let srv = TestServer::spawn().await;
    let id = srv.create_event("Cleanup day", "2026-06-01T08:00:00Z").await;
    let attendee = srv.add_attendee(&id, "Kim").await;
    srv.add_attendee(&id, "Lee").await;
    srv.rate_event(&id, 3).await;

    let (status, detail) = srv.get(&format!("/events/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["name"], "Cleanup day");
    assert_eq!(detail["attendees"].as_array().unwrap().len(), 2);
    assert_eq!(detail["ratings"][0]["rating"], 3);

    let res = srv
        .client
        .put(srv.url(&format!("/events/{id}")))
        .json(&json!({ "place": "Beach" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["place"], "Beach");
    assert_eq!(updated["name"], "Cleanup day");

    let res = srv
        .client
        .delete(srv.url(&format!("/attendees/{attendee}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let (_, attendees) = srv.get(&format!("/attendees?eventId={id}")).await;
    assert_eq!(attendees.as_array().unwrap().len(), 1);

    let res = srv
        .client
        .delete(srv.url(&format!("/events/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "id": id, "deleted": true }));

    let (_, summary) = srv.get("/reports/summary").await;
    assert_eq!(summary["totalEvents"], 0);
    assert_eq!(summary["totalAttendees"], 0);
    assert_eq!(summary["averageEventRating"], 0.0);

    let res = srv
        .client
        .delete(srv.url(&format!("/events/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listings_are_ordered() {
    let srv = TestServer::spawn().await;
    srv.create_event("Early", "2026-01-01T10:00:00Z").await;
    srv.create_event("Late", "2026-12-01T10:00:00Z").await;
    srv.create_experience("older").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    srv.create_experience("newer").await;

    let (_, events) = srv.get("/events").await;
    assert_eq!(events[0]["name"], "Late");

    let (_, experiences) = srv.get("/experiences").await;
    assert_eq!(experiences[0]["title"], "newer");
}

#[tokio::test]
async fn backend_failures_return_the_fixed_message_only() {
    let srv = TestServer::spawn_with(AppServices::new(Arc::new(UnreachableStore), 1000)).await;

    for (path, message) in [
        ("/reports/events", "Error fetching events report"),
        ("/reports/experiences", "Error fetching experiences report"),
        ("/reports/summary?period=month", "Error generating report summary"),
    ] {
        let res = srv.client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR, "{path}");
        let text = res.text().await.unwrap();
        assert!(!text.contains(BACKEND_DETAIL), "{path} leaked: {text}");
        let body: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(body, json!({ "error": message }), "{path}");
    }

    let (status, body) = srv
        .post("/event-ratings", json!({ "eventId": EventId::new().to_string(), "rating": 4 }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Error saving event rating" }));

    let (status, body) = srv
        .post(
            "/experience-ratings",
            json!({ "experienceId": ExperienceId::new().to_string(), "rating": 4 }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Error saving experience rating" }));
}
