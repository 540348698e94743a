//! `eventhub-core`: domain building blocks for the community event reports.
//!
//! This crate contains **pure domain** logic (no I/O): records, rating math,
//! sort/period resolution and the pagination contract.

pub mod entity;
pub mod error;
pub mod id;
pub mod metrics;
pub mod model;
pub mod order;
pub mod pagination;
pub mod period;
pub mod rating;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AttendeeId, EventId, ExperienceId, RatingId};
pub use metrics::{EntityMetrics, Mean, RatingAverages, RatingTally};
pub use model::{
    Attendee, EntityKind, Event, EventPatch, EventRating, EventWithRelations, Experience,
    ExperienceRating, ExperienceWithRatings, NewAttendee, NewEvent, NewExperience, RatedKind,
};
pub use order::{ExperienceOrderSpec, OrderSpec, SortDirection};
pub use pagination::{Page, PageRequest, PaginationBlock};
pub use period::Period;
pub use rating::RatingValue;
