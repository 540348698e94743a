//! Report composition over a [`ReportStore`].
//!
//! The service turns raw store rows into the three report payloads: the paged
//! events report, the paged experiences report and the summary. Store queries
//! that do not depend on each other are issued concurrently.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use tracing::instrument;

use eventhub_core::{
    EntityKind, EntityMetrics, Event, EventWithRelations, Experience, ExperienceOrderSpec,
    ExperienceWithRatings, OrderSpec, Page, PageRequest, PaginationBlock, Period, RatedKind,
    RatingAverages, RatingTally,
};

use crate::store::{ReportStore, StoreResult};

/// One row of the events report: the event plus its computed metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventReportRow {
    #[serde(flatten)]
    pub event: Event,
    #[serde(flatten)]
    pub metrics: EntityMetrics,
    pub attendee_count: u64,
}

impl From<EventWithRelations> for EventReportRow {
    fn from(row: EventWithRelations) -> Self {
        let tally = RatingTally::from_values(row.ratings.iter().map(|r| r.rating));
        Self {
            attendee_count: row.attendees.len() as u64,
            metrics: EntityMetrics::from_tally(tally),
            event: row.event,
        }
    }
}

/// One row of the experiences report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceReportRow {
    #[serde(flatten)]
    pub experience: Experience,
    #[serde(flatten)]
    pub metrics: EntityMetrics,
}

impl From<ExperienceWithRatings> for ExperienceReportRow {
    fn from(row: ExperienceWithRatings) -> Self {
        let tally = RatingTally::from_values(row.ratings.iter().map(|r| r.rating));
        Self {
            metrics: EntityMetrics::from_tally(tally),
            experience: row.experience,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventsReport {
    pub events: Vec<EventReportRow>,
    pub pagination: PaginationBlock,
}

impl From<Page<EventReportRow>> for EventsReport {
    fn from(page: Page<EventReportRow>) -> Self {
        Self {
            events: page.items,
            pagination: page.pagination,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperiencesReport {
    pub experiences: Vec<ExperienceReportRow>,
    pub pagination: PaginationBlock,
}

impl From<Page<ExperienceReportRow>> for ExperiencesReport {
    fn from(page: Page<ExperienceReportRow>) -> Self {
        Self {
            experiences: page.items,
            pagination: page.pagination,
        }
    }
}

/// Aggregate counts and averages, optionally scoped to a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub total_events: u64,
    pub events_this_period: u64,
    pub total_attendees: u64,
    pub attendees_this_period: u64,
    pub total_experiences: u64,
    pub experiences_this_period: u64,
    #[serde(flatten)]
    pub averages: RatingAverages,
    pub period: Period,
    #[serde(serialize_with = "serialize_millis")]
    pub generated_at: DateTime<Utc>,
}

fn serialize_millis<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Builds reports from any [`ReportStore`].
#[derive(Debug, Clone)]
pub struct ReportService<S> {
    store: S,
}

impl<S: ReportStore> ReportService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Page of events annotated with rating and attendee metrics.
    ///
    /// `pagination.total` counts every event, not just the page.
    #[instrument(skip(self), err)]
    pub async fn events_report(
        &self,
        order: OrderSpec,
        page: PageRequest,
    ) -> StoreResult<EventsReport> {
        let (rows, total) = tokio::try_join!(
            self.store.list_events(order, page),
            self.store.count_matching(EntityKind::Event, None),
        )?;
        let rows = rows.into_iter().map(EventReportRow::from).collect();
        Ok(Page::new(rows, page, total).into())
    }

    #[instrument(skip(self), err)]
    pub async fn experiences_report(
        &self,
        order: ExperienceOrderSpec,
        page: PageRequest,
    ) -> StoreResult<ExperiencesReport> {
        let (rows, total) = tokio::try_join!(
            self.store.list_experiences(order, page),
            self.store.count_matching(EntityKind::Experience, None),
        )?;
        let rows = rows.into_iter().map(ExperienceReportRow::from).collect();
        Ok(Page::new(rows, page, total).into())
    }

    /// Summary scoped to `period`, bounded on the server's local calendar.
    pub async fn summary(&self, period: Period) -> StoreResult<SummaryReport> {
        let now = Local::now();
        let since = period.lower_bound(&now);
        self.summary_since(period, since, now.with_timezone(&Utc))
            .await
    }

    /// Summary with an explicit lower creation bound and generation time.
    #[instrument(skip(self), err)]
    pub async fn summary_since(
        &self,
        period: Period,
        since: Option<DateTime<Utc>>,
        generated_at: DateTime<Utc>,
    ) -> StoreResult<SummaryReport> {
        let store = &self.store;
        let (
            total_events,
            events_this_period,
            total_attendees,
            attendees_this_period,
            total_experiences,
            experiences_this_period,
            event_tally,
            experience_tally,
        ) = tokio::try_join!(
            store.count_matching(EntityKind::Event, None),
            store.count_matching(EntityKind::Event, since),
            store.count_matching(EntityKind::Attendee, None),
            store.count_matching(EntityKind::Attendee, since),
            store.count_matching(EntityKind::Experience, None),
            store.count_matching(EntityKind::Experience, since),
            store.rating_tally(RatedKind::Event),
            store.rating_tally(RatedKind::Experience),
        )?;

        Ok(SummaryReport {
            total_events,
            events_this_period,
            total_attendees,
            attendees_this_period,
            total_experiences,
            experiences_this_period,
            averages: RatingAverages::combine(event_tally, experience_tally),
            period,
            generated_at,
        })
    }
}
