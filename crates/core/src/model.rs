//! Persisted records and the inputs that create them.
//!
//! Records serialize with camelCase field names, which is the JSON shape every
//! endpoint exposes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::id::{AttendeeId, EventId, ExperienceId, RatingId};
use crate::rating::RatingValue;

/// The kinds of persisted records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Event,
    Experience,
    Attendee,
    EventRating,
    ExperienceRating,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Event => "event",
            EntityKind::Experience => "experience",
            EntityKind::Attendee => "attendee",
            EntityKind::EventRating => "event_rating",
            EntityKind::ExperienceRating => "experience_rating",
        }
    }

    /// Backing table name in relational stores.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Event => "events",
            EntityKind::Experience => "experiences",
            EntityKind::Attendee => "attendees",
            EntityKind::EventRating => "event_ratings",
            EntityKind::ExperienceRating => "experience_ratings",
        }
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two kinds of rating rows.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RatedKind {
    Event,
    Experience,
}

impl RatedKind {
    pub fn rating_kind(&self) -> EntityKind {
        match self {
            RatedKind::Event => EntityKind::EventRating,
            RatedKind::Experience => EntityKind::ExperienceRating,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub date: DateTime<Utc>,
    pub place: String,
    pub description: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub id: ExperienceId,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub id: AttendeeId,
    pub event_id: EventId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRating {
    pub id: RatingId,
    pub event_id: EventId,
    pub rating: RatingValue,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceRating {
    pub id: RatingId,
    pub experience_id: ExperienceId,
    pub rating: RatingValue,
    pub created_at: DateTime<Utc>,
}

/// An event together with every attendee and rating row that belongs to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventWithRelations {
    pub event: Event,
    pub attendees: Vec<Attendee>,
    pub ratings: Vec<EventRating>,
}

/// An experience together with every rating row that belongs to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperienceWithRatings {
    pub experience: Experience,
    pub ratings: Vec<ExperienceRating>,
}

impl Entity for Event {
    type Id = EventId;

    fn id(&self) -> &EventId {
        &self.id
    }
}

impl Entity for Experience {
    type Id = ExperienceId;

    fn id(&self) -> &ExperienceId {
        &self.id
    }
}

impl Entity for Attendee {
    type Id = AttendeeId;

    fn id(&self) -> &AttendeeId {
        &self.id
    }
}

impl Entity for EventRating {
    type Id = RatingId;

    fn id(&self) -> &RatingId {
        &self.id
    }
}

impl Entity for ExperienceRating {
    type Id = RatingId;

    fn id(&self) -> &RatingId {
        &self.id
    }
}

fn require_text(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Input for creating an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub name: String,
    pub date: DateTime<Utc>,
    pub place: String,
    pub description: String,
    pub image_url: Option<String>,
}

impl NewEvent {
    pub fn validate(&self) -> DomainResult<()> {
        require_text("name", &self.name)?;
        require_text("place", &self.place)
    }

    pub fn into_event(self, now: DateTime<Utc>) -> Event {
        Event {
            id: EventId::new(),
            name: self.name.trim().to_string(),
            date: self.date,
            place: self.place.trim().to_string(),
            description: self.description,
            image_url: blank_to_none(self.image_url),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of an event; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub place: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl EventPatch {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(place) = &self.place {
            require_text("place", place)?;
        }
        Ok(())
    }

    pub fn apply(self, event: &mut Event, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            event.name = name.trim().to_string();
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(place) = self.place {
            event.place = place.trim().to_string();
        }
        if let Some(description) = self.description {
            event.description = description;
        }
        if self.image_url.is_some() {
            event.image_url = blank_to_none(self.image_url);
        }
        event.updated_at = now;
    }
}

/// Input for registering an attendee to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendee {
    pub event_id: EventId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl NewAttendee {
    pub fn validate(&self) -> DomainResult<()> {
        require_text("name", &self.name)
    }

    pub fn into_attendee(self, now: DateTime<Utc>) -> Attendee {
        Attendee {
            id: AttendeeId::new(),
            event_id: self.event_id,
            name: self.name.trim().to_string(),
            email: blank_to_none(self.email),
            phone: blank_to_none(self.phone),
            created_at: now,
        }
    }
}

/// Input for posting an experience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExperience {
    pub title: String,
    pub description: String,
}

impl NewExperience {
    pub fn validate(&self) -> DomainResult<()> {
        require_text("title", &self.title)
    }

    pub fn into_experience(self, now: DateTime<Utc>) -> Experience {
        Experience {
            id: ExperienceId::new(),
            title: self.title.trim().to_string(),
            description: self.description,
            created_at: now,
            updated_at: now,
        }
    }
}
