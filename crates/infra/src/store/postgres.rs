//! Postgres-backed store.
//!
//! Queries are plain parameterized SQL. Identifiers that cannot be bound as
//! parameters (table names, sort clauses) come only from closed enums.
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | StoreError |
//! |------------|-----------------|------------|
//! | Database (foreign key violation) on child insert | `23503` | `NotFound` (parent) |
//! | Database (check violation) | `23514` | `Validation` |
//! | Anything else | any | `Backend` |

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

use eventhub_core::{
    Attendee, AttendeeId, EntityKind, Event, EventId, EventPatch, EventRating, EventWithRelations,
    Experience, ExperienceId, ExperienceOrderSpec, ExperienceRating, ExperienceWithRatings,
    NewAttendee, NewEvent, NewExperience, OrderSpec, PageRequest, RatedKind, RatingId, RatingTally,
    RatingValue,
};

use super::{now, schema, CatalogStore, ReportStore, StoreError, StoreResult};

const EVENT_COLUMNS: &str =
    "e.id, e.name, e.date, e.place, e.description, e.image_url, e.created_at, e.updated_at";
const EXPERIENCE_COLUMNS: &str = "x.id, x.title, x.description, x.created_at, x.updated_at";

/// Postgres implementation of both store traits.
///
/// `PgPool` is internally reference counted; cloning the store shares the pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool of at most `max_connections` connections.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in schema::STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    async fn attach_event_relations(&self, events: Vec<Event>) -> StoreResult<Vec<EventWithRelations>> {
        if events.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<Uuid> = events.iter().map(|e| *e.id.as_uuid()).collect();

        let (attendee_rows, rating_rows) = tokio::try_join!(
            sqlx::query(
                r#"
                SELECT id, event_id, name, email, phone, created_at
                FROM attendees
                WHERE event_id = ANY($1)
                ORDER BY created_at ASC, id ASC
                "#,
            )
            .bind(&ids)
            .fetch_all(&self.pool),
            sqlx::query(
                r#"
                SELECT id, event_id, rating, created_at
                FROM event_ratings
                WHERE event_id = ANY($1)
                ORDER BY created_at ASC, id ASC
                "#,
            )
            .bind(&ids)
            .fetch_all(&self.pool),
        )
        .map_err(|e| map_sqlx_error("attach_event_relations", e))?;

        let mut attendees: HashMap<EventId, Vec<Attendee>> = HashMap::new();
        for row in &attendee_rows {
            let attendee = attendee_from_row(row).map_err(|e| map_sqlx_error("decode_attendee", e))?;
            attendees.entry(attendee.event_id).or_default().push(attendee);
        }
        let mut ratings: HashMap<EventId, Vec<EventRating>> = HashMap::new();
        for row in &rating_rows {
            let rating = event_rating_from_row(row).map_err(|e| map_sqlx_error("decode_event_rating", e))?;
            ratings.entry(rating.event_id).or_default().push(rating);
        }

        Ok(events
            .into_iter()
            .map(|event| EventWithRelations {
                attendees: attendees.remove(&event.id).unwrap_or_default(),
                ratings: ratings.remove(&event.id).unwrap_or_default(),
                event,
            })
            .collect())
    }

    async fn attach_experience_ratings(
        &self,
        experiences: Vec<Experience>,
    ) -> StoreResult<Vec<ExperienceWithRatings>> {
        if experiences.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<Uuid> = experiences.iter().map(|x| *x.id.as_uuid()).collect();

        let rows = sqlx::query(
            r#"
            SELECT id, experience_id, rating, created_at
            FROM experience_ratings
            WHERE experience_id = ANY($1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("attach_experience_ratings", e))?;

        let mut ratings: HashMap<ExperienceId, Vec<ExperienceRating>> = HashMap::new();
        for row in &rows {
            let rating =
                experience_rating_from_row(row).map_err(|e| map_sqlx_error("decode_experience_rating", e))?;
            ratings.entry(rating.experience_id).or_default().push(rating);
        }

        Ok(experiences
            .into_iter()
            .map(|experience| ExperienceWithRatings {
                ratings: ratings.remove(&experience.id).unwrap_or_default(),
                experience,
            })
            .collect())
    }
}

fn event_order_clause(order: OrderSpec) -> String {
    let key = match order {
        OrderSpec::ByDate(_) => "e.date",
        OrderSpec::ByRatingMean(_) => {
            "(SELECT COALESCE(AVG(r.rating), 0) FROM event_ratings r WHERE r.event_id = e.id)"
        }
        OrderSpec::ByAttendeeCount(_) => "(SELECT COUNT(*) FROM attendees a WHERE a.event_id = e.id)",
    };
    format!("{key} {}, e.id ASC", order.direction().as_sql())
}

fn experience_order_clause(order: ExperienceOrderSpec) -> String {
    let key = match order {
        ExperienceOrderSpec::ByCreatedAt(_) => "x.created_at",
        ExperienceOrderSpec::ByRatingMean(_) => {
            "(SELECT COALESCE(AVG(r.rating), 0) FROM experience_ratings r WHERE r.experience_id = x.id)"
        }
    };
    format!("{key} {}, x.id ASC", order.direction().as_sql())
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl ReportStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn list_events(
        &self,
        order: OrderSpec,
        page: PageRequest,
    ) -> StoreResult<Vec<EventWithRelations>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events e ORDER BY {} LIMIT $1 OFFSET $2",
            event_order_clause(order)
        );
        let rows = sqlx::query(&sql)
            .bind(to_i64(page.limit))
            .bind(to_i64(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_events", e))?;

        let events = rows
            .iter()
            .map(event_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_event", e))?;
        self.attach_event_relations(events).await
    }

    #[instrument(skip(self), err)]
    async fn list_experiences(
        &self,
        order: ExperienceOrderSpec,
        page: PageRequest,
    ) -> StoreResult<Vec<ExperienceWithRatings>> {
        let sql = format!(
            "SELECT {EXPERIENCE_COLUMNS} FROM experiences x ORDER BY {} LIMIT $1 OFFSET $2",
            experience_order_clause(order)
        );
        let rows = sqlx::query(&sql)
            .bind(to_i64(page.limit))
            .bind(to_i64(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_experiences", e))?;

        let experiences = rows
            .iter()
            .map(experience_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_experience", e))?;
        self.attach_experience_ratings(experiences).await
    }

    #[instrument(skip(self), err)]
    async fn count_matching(
        &self,
        kind: EntityKind,
        created_since: Option<DateTime<Utc>>,
    ) -> StoreResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) AS total FROM {} WHERE ($1::timestamptz IS NULL OR created_at >= $1)",
            kind.table()
        );
        let row = sqlx::query(&sql)
            .bind(created_since)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_matching", e))?;
        let total: i64 = row
            .try_get("total")
            .map_err(|e| map_sqlx_error("decode_count", e))?;
        Ok(total.max(0) as u64)
    }

    #[instrument(skip(self), err)]
    async fn rating_tally(&self, kind: RatedKind) -> StoreResult<RatingTally> {
        let sql = format!(
            "SELECT COALESCE(SUM(rating), 0)::BIGINT AS sum, COUNT(*) AS count FROM {}",
            kind.rating_kind().table()
        );
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("rating_tally", e))?;
        let sum: i64 = row.try_get("sum").map_err(|e| map_sqlx_error("decode_tally", e))?;
        let count: i64 = row.try_get("count").map_err(|e| map_sqlx_error("decode_tally", e))?;
        Ok(RatingTally::new(sum.max(0) as u64, count.max(0) as u64))
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    #[instrument(skip(self, input), err)]
    async fn create_event(&self, input: NewEvent) -> StoreResult<Event> {
        input.validate()?;
        let event = input.into_event(now());
        sqlx::query(
            r#"
            INSERT INTO events (id, name, date, place, description, image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(&event.name)
        .bind(event.date)
        .bind(&event.place)
        .bind(&event.description)
        .bind(&event.image_url)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_event", e))?;
        Ok(event)
    }

    #[instrument(skip(self), err)]
    async fn all_events(&self) -> StoreResult<Vec<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events e ORDER BY e.date DESC, e.id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("all_events", e))?;
        rows.iter()
            .map(event_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_event", e))
    }

    #[instrument(skip(self), err)]
    async fn get_event(&self, id: EventId) -> StoreResult<Option<EventWithRelations>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_event", e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let event = event_from_row(&row).map_err(|e| map_sqlx_error("decode_event", e))?;
        Ok(self.attach_event_relations(vec![event]).await?.pop())
    }

    #[instrument(skip(self, patch), err)]
    async fn update_event(&self, id: EventId, patch: EventPatch) -> StoreResult<Event> {
        patch.validate()?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let sql = format!("SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_event", e))?;
        let Some(row) = row else {
            return Err(StoreError::not_found(EntityKind::Event, id));
        };
        let mut event = event_from_row(&row).map_err(|e| map_sqlx_error("decode_event", e))?;
        patch.apply(&mut event, now());

        sqlx::query(
            r#"
            UPDATE events
            SET name = $2, date = $3, place = $4, description = $5, image_url = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(&event.name)
        .bind(event.date)
        .bind(&event.place)
        .bind(&event.description)
        .bind(&event.image_url)
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_event", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(event)
    }

    #[instrument(skip(self), err)]
    async fn delete_event(&self, id: EventId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_event", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(EntityKind::Event, id));
        }
        Ok(())
    }

    #[instrument(skip(self, input), err)]
    async fn add_attendee(&self, input: NewAttendee) -> StoreResult<Attendee> {
        input.validate()?;
        let attendee = input.into_attendee(now());
        sqlx::query(
            r#"
            INSERT INTO attendees (id, event_id, name, email, phone, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(attendee.id.as_uuid())
        .bind(attendee.event_id.as_uuid())
        .bind(&attendee.name)
        .bind(&attendee.email)
        .bind(&attendee.phone)
        .bind(attendee.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::not_found(EntityKind::Event, attendee.event_id)
            } else {
                map_sqlx_error("add_attendee", e)
            }
        })?;
        Ok(attendee)
    }

    #[instrument(skip(self), err)]
    async fn attendees_for_event(&self, event_id: EventId) -> StoreResult<Vec<Attendee>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_id, name, email, phone, created_at
            FROM attendees
            WHERE event_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(event_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("attendees_for_event", e))?;
        rows.iter()
            .map(attendee_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_attendee", e))
    }

    #[instrument(skip(self), err)]
    async fn remove_attendee(&self, id: AttendeeId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM attendees WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_attendee", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(EntityKind::Attendee, id));
        }
        Ok(())
    }

    #[instrument(skip(self, input), err)]
    async fn create_experience(&self, input: NewExperience) -> StoreResult<Experience> {
        input.validate()?;
        let experience = input.into_experience(now());
        sqlx::query(
            r#"
            INSERT INTO experiences (id, title, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(experience.id.as_uuid())
        .bind(&experience.title)
        .bind(&experience.description)
        .bind(experience.created_at)
        .bind(experience.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_experience", e))?;
        Ok(experience)
    }

    #[instrument(skip(self), err)]
    async fn all_experiences(&self) -> StoreResult<Vec<Experience>> {
        let sql = format!("SELECT {EXPERIENCE_COLUMNS} FROM experiences x ORDER BY x.created_at DESC, x.id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("all_experiences", e))?;
        rows.iter()
            .map(experience_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_experience", e))
    }

    #[instrument(skip(self), err)]
    async fn get_experience(&self, id: ExperienceId) -> StoreResult<Option<ExperienceWithRatings>> {
        let sql = format!("SELECT {EXPERIENCE_COLUMNS} FROM experiences x WHERE x.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_experience", e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let experience = experience_from_row(&row).map_err(|e| map_sqlx_error("decode_experience", e))?;
        Ok(self.attach_experience_ratings(vec![experience]).await?.pop())
    }

    #[instrument(skip(self), err)]
    async fn rate_event(&self, event_id: EventId, rating: RatingValue) -> StoreResult<EventRating> {
        let row = EventRating {
            id: RatingId::new(),
            event_id,
            rating,
            created_at: now(),
        };
        sqlx::query("INSERT INTO event_ratings (id, event_id, rating, created_at) VALUES ($1, $2, $3, $4)")
            .bind(row.id.as_uuid())
            .bind(event_id.as_uuid())
            .bind(i16::from(rating.get()))
            .bind(row.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::not_found(EntityKind::Event, event_id)
                } else {
                    map_sqlx_error("rate_event", e)
                }
            })?;
        Ok(row)
    }

    #[instrument(skip(self), err)]
    async fn rate_experience(
        &self,
        experience_id: ExperienceId,
        rating: RatingValue,
    ) -> StoreResult<ExperienceRating> {
        let row = ExperienceRating {
            id: RatingId::new(),
            experience_id,
            rating,
            created_at: now(),
        };
        sqlx::query(
            "INSERT INTO experience_ratings (id, experience_id, rating, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(row.id.as_uuid())
        .bind(experience_id.as_uuid())
        .bind(i16::from(rating.get()))
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::not_found(EntityKind::Experience, experience_id)
            } else {
                map_sqlx_error("rate_experience", e)
            }
        })?;
        Ok(row)
    }
}

// Row decoding

fn rating_from_column(row: &PgRow) -> Result<RatingValue, sqlx::Error> {
    let raw: i16 = row.try_get("rating")?;
    RatingValue::new(i64::from(raw)).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn event_from_row(row: &PgRow) -> Result<Event, sqlx::Error> {
    Ok(Event {
        id: EventId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        date: row.try_get("date")?,
        place: row.try_get("place")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn experience_from_row(row: &PgRow) -> Result<Experience, sqlx::Error> {
    Ok(Experience {
        id: ExperienceId::from_uuid(row.try_get("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn attendee_from_row(row: &PgRow) -> Result<Attendee, sqlx::Error> {
    Ok(Attendee {
        id: AttendeeId::from_uuid(row.try_get("id")?),
        event_id: EventId::from_uuid(row.try_get("event_id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        created_at: row.try_get("created_at")?,
    })
}

fn event_rating_from_row(row: &PgRow) -> Result<EventRating, sqlx::Error> {
    Ok(EventRating {
        id: RatingId::from_uuid(row.try_get("id")?),
        event_id: EventId::from_uuid(row.try_get("event_id")?),
        rating: rating_from_column(row)?,
        created_at: row.try_get("created_at")?,
    })
}

fn experience_rating_from_row(row: &PgRow) -> Result<ExperienceRating, sqlx::Error> {
    Ok(ExperienceRating {
        id: RatingId::from_uuid(row.try_get("id")?),
        experience_id: ExperienceId::from_uuid(row.try_get("experience_id")?),
        rating: rating_from_column(row)?,
        created_at: row.try_get("created_at")?,
    })
}

/// Map a SQLx error to a store error.
fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23514") => StoreError::Validation(msg),
                _ => StoreError::backend(operation, msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::backend(operation, "connection pool closed"),
        sqlx::Error::PoolTimedOut => StoreError::backend(operation, "timed out acquiring a connection"),
        other => StoreError::backend(operation, other.to_string()),
    }
}

/// Check if an error is a foreign key violation (missing parent row).
fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23503";
        }
    }
    false
}
