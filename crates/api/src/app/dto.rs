use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eventhub_core::{
    Attendee, Event, EventId, EventPatch, EventRating, EventWithRelations, Experience,
    ExperienceId, ExperienceOrderSpec, ExperienceRating, ExperienceWithRatings, NewAttendee,
    NewEvent, NewExperience, OrderSpec, PageRequest, Period, RatingValue,
};

use crate::app::errors;

// -------------------------
// Query DTOs
// -------------------------

/// Raw `key=value` pairs of a query string, in order of appearance.
pub type QueryPairs = Vec<(String, String)>;

/// First value given for `key`; later repeats are ignored.
fn first_value(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
}

/// Query string of the paged reports.
///
/// Every field is kept raw so malformed values fall back to defaults instead
/// of rejecting the request.
#[derive(Debug, Default)]
pub struct ReportPageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ReportPageQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            limit: first_value(pairs, "limit"),
            offset: first_value(pairs, "offset"),
            sort_by: first_value(pairs, "sortBy"),
            sort_order: first_value(pairs, "sortOrder"),
        }
    }

    pub fn page(&self, max_limit: u64) -> PageRequest {
        PageRequest::from_params(self.limit.as_deref(), self.offset.as_deref(), max_limit)
    }

    pub fn event_order(&self) -> OrderSpec {
        OrderSpec::for_events(self.sort_by.as_deref(), self.sort_order.as_deref())
    }

    pub fn experience_order(&self) -> ExperienceOrderSpec {
        ExperienceOrderSpec::for_experiences(self.sort_by.as_deref(), self.sort_order.as_deref())
    }
}

#[derive(Debug, Default)]
pub struct SummaryQuery {
    pub period: Option<String>,
}

impl SummaryQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            period: first_value(pairs, "period"),
        }
    }

    pub fn period(&self) -> Period {
        Period::parse(self.period.as_deref())
    }
}

#[derive(Debug, Default)]
pub struct AttendeeListQuery {
    pub event_id: Option<String>,
}

impl AttendeeListQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            event_id: first_value(pairs, "eventId"),
        }
    }
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub name: String,
    pub date: DateTime<Utc>,
    pub place: String,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
}

impl From<CreateEventRequest> for NewEvent {
    fn from(req: CreateEventRequest) -> Self {
        NewEvent {
            name: req.name,
            date: req.date,
            place: req.place,
            description: req.description,
            image_url: req.image_url,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub place: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl From<UpdateEventRequest> for EventPatch {
    fn from(req: UpdateEventRequest) -> Self {
        EventPatch {
            name: req.name,
            date: req.date,
            place: req.place,
            description: req.description,
            image_url: req.image_url,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttendeeRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub event_id: String,
}

impl CreateAttendeeRequest {
    pub fn into_input(self) -> Result<NewAttendee, axum::response::Response> {
        Ok(NewAttendee {
            event_id: parse_id(&self.event_id)?,
            name: self.name,
            email: self.email,
            phone: self.phone,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExperienceRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl From<CreateExperienceRequest> for NewExperience {
    fn from(req: CreateExperienceRequest) -> Self {
        NewExperience {
            title: req.title,
            description: req.description,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateEventRequest {
    pub event_id: String,
    pub rating: i64,
}

impl RateEventRequest {
    pub fn parse(&self) -> Result<(EventId, RatingValue), axum::response::Response> {
        let id = parse_id(&self.event_id)?;
        let rating = RatingValue::new(self.rating).map_err(errors::domain_error_to_response)?;
        Ok((id, rating))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateExperienceRequest {
    pub experience_id: String,
    pub rating: i64,
}

impl RateExperienceRequest {
    pub fn parse(&self) -> Result<(ExperienceId, RatingValue), axum::response::Response> {
        let id = parse_id(&self.experience_id)?;
        let rating = RatingValue::new(self.rating).map_err(errors::domain_error_to_response)?;
        Ok((id, rating))
    }
}

// -------------------------
// Response DTOs
// -------------------------

/// An event with its attendees and ratings nested.
#[derive(Debug, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub attendees: Vec<Attendee>,
    pub ratings: Vec<EventRating>,
}

impl From<EventWithRelations> for EventDetail {
    fn from(row: EventWithRelations) -> Self {
        Self {
            event: row.event,
            attendees: row.attendees,
            ratings: row.ratings,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExperienceDetail {
    #[serde(flatten)]
    pub experience: Experience,
    pub ratings: Vec<ExperienceRating>,
}

impl From<ExperienceWithRatings> for ExperienceDetail {
    fn from(row: ExperienceWithRatings) -> Self {
        Self {
            experience: row.experience,
            ratings: row.ratings,
        }
    }
}

/// Acknowledgement of a delete.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: String,
    pub deleted: bool,
}

impl Deleted {
    pub fn new(id: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            deleted: true,
        }
    }
}

// -------------------------
// Mapping helpers
// -------------------------

/// Parse an identifier from a path segment or body field (400 on failure).
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: std::str::FromStr<Err = eventhub_core::DomainError>,
{
    raw.trim().parse().map_err(errors::domain_error_to_response)
}

/// Unwrap a JSON body, answering malformed or incomplete bodies with 400.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| errors::json_error(StatusCode::BAD_REQUEST, rejection.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventhub_core::SortDirection;

    fn pairs(raw: &[(&str, &str)]) -> QueryPairs {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn report_query_falls_back_to_defaults() {
        let query = ReportPageQuery::default();
        assert_eq!(query.page(1000), PageRequest::new(10, 0));
        assert_eq!(query.event_order(), OrderSpec::ByDate(SortDirection::Desc));
        assert_eq!(
            query.experience_order(),
            ExperienceOrderSpec::ByRatingMean(SortDirection::Desc)
        );
    }

    #[test]
    fn report_query_reads_camel_case_names() {
        let query = ReportPageQuery::from_pairs(&pairs(&[
            ("limit", "5"),
            ("offset", "-3"),
            ("sortBy", "attendees"),
            ("sortOrder", "ASC"),
        ]));
        assert_eq!(query.page(1000), PageRequest::new(5, 0));
        assert_eq!(query.event_order(), OrderSpec::ByAttendeeCount(SortDirection::Asc));
    }

    #[test]
    fn repeated_keys_keep_the_first_value() {
        let query = ReportPageQuery::from_pairs(&pairs(&[
            ("limit", "1"),
            ("sortBy", "rating"),
            ("sortOrder", "asc"),
            ("sortOrder", "desc"),
            ("limit", "50"),
        ]));
        assert_eq!(query.page(1000), PageRequest::new(1, 0));
        assert_eq!(query.event_order(), OrderSpec::ByRatingMean(SortDirection::Asc));

        let summary = SummaryQuery::from_pairs(&pairs(&[("period", "year"), ("period", "month")]));
        assert_eq!(summary.period(), Period::Year);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let query = ReportPageQuery::from_pairs(&pairs(&[("page", "2"), ("sort_by", "rating")]));
        assert_eq!(query.page(1000), PageRequest::new(10, 0));
        assert_eq!(query.event_order(), OrderSpec::ByDate(SortDirection::Desc));

        let attendees = AttendeeListQuery::from_pairs(&pairs(&[("eventId", "abc")]));
        assert_eq!(attendees.event_id.as_deref(), Some("abc"));
    }

    #[test]
    fn rating_requests_validate_range_and_id() {
        let ok = RateEventRequest {
            event_id: EventId::new().to_string(),
            rating: 5,
        };
        assert!(ok.parse().is_ok());

        let out_of_range = RateEventRequest {
            event_id: EventId::new().to_string(),
            rating: 6,
        };
        assert_eq!(out_of_range.parse().unwrap_err().status(), StatusCode::BAD_REQUEST);

        let bad_id = RateExperienceRequest {
            experience_id: "nope".into(),
            rating: 3,
        };
        assert_eq!(bad_id.parse().unwrap_err().status(), StatusCode::BAD_REQUEST);
    }
}
