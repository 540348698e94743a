//! Store boundary for the report queries and the write path that feeds them.
//!
//! Two traits split the read side (`ReportStore`, the aggregation adapter the
//! reports are built on) from the write side (`CatalogStore`, the CRUD
//! collaborator). Both are implemented by the in-memory store (dev/tests) and
//! the Postgres store (production).

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use thiserror::Error;

use eventhub_core::{
    Attendee, AttendeeId, DomainError, EntityKind, Event, EventId, EventPatch, EventRating,
    EventWithRelations, Experience, ExperienceId, ExperienceOrderSpec, ExperienceRating,
    ExperienceWithRatings, NewAttendee, NewEvent, NewExperience, OrderSpec, PageRequest, RatedKind,
    RatingTally, RatingValue,
};

pub mod in_memory;
pub mod postgres;
mod schema;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation error.
///
/// `Backend` carries internal detail for logs only; the HTTP layer never
/// forwards it to clients.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("store failure in {operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => StoreError::Validation(msg),
        }
    }
}

/// Read-only aggregation queries behind the reports.
///
/// Every list query returns rows with their relations attached so metrics can
/// be computed per row without follow-up queries.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Ordered page of events with all attendees and ratings attached.
    async fn list_events(
        &self,
        order: OrderSpec,
        page: PageRequest,
    ) -> StoreResult<Vec<EventWithRelations>>;

    /// Ordered page of experiences with all ratings attached.
    async fn list_experiences(
        &self,
        order: ExperienceOrderSpec,
        page: PageRequest,
    ) -> StoreResult<Vec<ExperienceWithRatings>>;

    /// Count rows of `kind`, optionally only those created at or after `created_since`.
    async fn count_matching(
        &self,
        kind: EntityKind,
        created_since: Option<DateTime<Utc>>,
    ) -> StoreResult<u64>;

    /// Sum and count over every rating row of the given kind.
    async fn rating_tally(&self, kind: RatedKind) -> StoreResult<RatingTally>;
}

/// Write path and single-record reads.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_event(&self, input: NewEvent) -> StoreResult<Event>;

    /// Every event, latest event date first.
    async fn all_events(&self) -> StoreResult<Vec<Event>>;

    async fn get_event(&self, id: EventId) -> StoreResult<Option<EventWithRelations>>;

    async fn update_event(&self, id: EventId, patch: EventPatch) -> StoreResult<Event>;

    /// Removes the event along with its attendees and ratings.
    async fn delete_event(&self, id: EventId) -> StoreResult<()>;

    async fn add_attendee(&self, input: NewAttendee) -> StoreResult<Attendee>;

    /// Attendees of one event, in registration order.
    async fn attendees_for_event(&self, event_id: EventId) -> StoreResult<Vec<Attendee>>;

    async fn remove_attendee(&self, id: AttendeeId) -> StoreResult<()>;

    async fn create_experience(&self, input: NewExperience) -> StoreResult<Experience>;

    /// Every experience, newest first.
    async fn all_experiences(&self) -> StoreResult<Vec<Experience>>;

    async fn get_experience(&self, id: ExperienceId) -> StoreResult<Option<ExperienceWithRatings>>;

    async fn rate_event(&self, event_id: EventId, rating: RatingValue) -> StoreResult<EventRating>;

    async fn rate_experience(
        &self,
        experience_id: ExperienceId,
        rating: RatingValue,
    ) -> StoreResult<ExperienceRating>;
}

/// A store serving both the reports and the write path.
pub trait CommunityStore: ReportStore + CatalogStore {}

impl<T: ReportStore + CatalogStore> CommunityStore for T {}

#[async_trait]
impl<S> ReportStore for Arc<S>
where
    S: ReportStore + ?Sized,
{
    async fn list_events(
        &self,
        order: OrderSpec,
        page: PageRequest,
    ) -> StoreResult<Vec<EventWithRelations>> {
        (**self).list_events(order, page).await
    }

    async fn list_experiences(
        &self,
        order: ExperienceOrderSpec,
        page: PageRequest,
    ) -> StoreResult<Vec<ExperienceWithRatings>> {
        (**self).list_experiences(order, page).await
    }

    async fn count_matching(
        &self,
        kind: EntityKind,
        created_since: Option<DateTime<Utc>>,
    ) -> StoreResult<u64> {
        (**self).count_matching(kind, created_since).await
    }

    async fn rating_tally(&self, kind: RatedKind) -> StoreResult<RatingTally> {
        (**self).rating_tally(kind).await
    }
}

#[async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    async fn create_event(&self, input: NewEvent) -> StoreResult<Event> {
        (**self).create_event(input).await
    }

    async fn all_events(&self) -> StoreResult<Vec<Event>> {
        (**self).all_events().await
    }

    async fn get_event(&self, id: EventId) -> StoreResult<Option<EventWithRelations>> {
        (**self).get_event(id).await
    }

    async fn update_event(&self, id: EventId, patch: EventPatch) -> StoreResult<Event> {
        (**self).update_event(id, patch).await
    }

    async fn delete_event(&self, id: EventId) -> StoreResult<()> {
        (**self).delete_event(id).await
    }

    async fn add_attendee(&self, input: NewAttendee) -> StoreResult<Attendee> {
        (**self).add_attendee(input).await
    }

    async fn attendees_for_event(&self, event_id: EventId) -> StoreResult<Vec<Attendee>> {
        (**self).attendees_for_event(event_id).await
    }

    async fn remove_attendee(&self, id: AttendeeId) -> StoreResult<()> {
        (**self).remove_attendee(id).await
    }

    async fn create_experience(&self, input: NewExperience) -> StoreResult<Experience> {
        (**self).create_experience(input).await
    }

    async fn all_experiences(&self) -> StoreResult<Vec<Experience>> {
        (**self).all_experiences().await
    }

    async fn get_experience(&self, id: ExperienceId) -> StoreResult<Option<ExperienceWithRatings>> {
        (**self).get_experience(id).await
    }

    async fn rate_event(&self, event_id: EventId, rating: RatingValue) -> StoreResult<EventRating> {
        (**self).rate_event(event_id, rating).await
    }

    async fn rate_experience(
        &self,
        experience_id: ExperienceId,
        rating: RatingValue,
    ) -> StoreResult<ExperienceRating> {
        (**self).rate_experience(experience_id, rating).await
    }
}

/// Current time truncated to microseconds, the precision of `timestamptz`.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
