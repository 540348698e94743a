//! In-memory store for tests/dev.
//!
//! Records live in uniquely-keyed tables behind one `RwLock`; attendees and
//! ratings reference their owning record by id, and deleting an event cascades
//! to its children the way the relational schema does.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use eventhub_core::{
    Attendee, AttendeeId, Entity, EntityKind, Event, EventId, EventPatch, EventRating,
    EventWithRelations, Experience, ExperienceId, ExperienceOrderSpec, ExperienceRating,
    ExperienceWithRatings, NewAttendee, NewEvent, NewExperience, OrderSpec, PageRequest, RatedKind,
    RatingId, RatingTally, RatingValue,
};

use super::{now, CatalogStore, ReportStore, StoreError, StoreResult};

/// Uniquely-keyed table of one entity kind.
#[derive(Debug)]
struct Table<T: Entity> {
    rows: BTreeMap<T::Id, T>,
}

impl<T: Entity> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<T: Entity + Clone> Table<T> {
    fn insert(&mut self, row: T) {
        self.rows.insert(*row.id(), row);
    }

    fn get(&self, id: &T::Id) -> Option<&T> {
        self.rows.get(id)
    }

    fn get_mut(&mut self, id: &T::Id) -> Option<&mut T> {
        self.rows.get_mut(id)
    }

    fn remove(&mut self, id: &T::Id) -> Option<T> {
        self.rows.remove(id)
    }

    fn contains(&self, id: &T::Id) -> bool {
        self.rows.contains_key(id)
    }

    fn values(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.rows.retain(|_, row| keep(row));
    }
}

#[derive(Debug, Default)]
struct Tables {
    events: Table<Event>,
    experiences: Table<Experience>,
    attendees: Table<Attendee>,
    event_ratings: Table<EventRating>,
    experience_ratings: Table<ExperienceRating>,
}

impl Tables {
    /// Every event joined with its attendees and ratings (registration order).
    fn events_with_relations(&self) -> Vec<EventWithRelations> {
        let mut attendees: HashMap<EventId, Vec<Attendee>> = HashMap::new();
        for a in self.attendees.values() {
            attendees.entry(a.event_id).or_default().push(a.clone());
        }
        let mut ratings: HashMap<EventId, Vec<EventRating>> = HashMap::new();
        for r in self.event_ratings.values() {
            ratings.entry(r.event_id).or_default().push(r.clone());
        }

        self.events
            .values()
            .map(|event| EventWithRelations {
                attendees: attendees.remove(&event.id).unwrap_or_default(),
                ratings: ratings.remove(&event.id).unwrap_or_default(),
                event: event.clone(),
            })
            .collect()
    }

    fn experiences_with_ratings(&self) -> Vec<ExperienceWithRatings> {
        let mut ratings: HashMap<ExperienceId, Vec<ExperienceRating>> = HashMap::new();
        for r in self.experience_ratings.values() {
            ratings.entry(r.experience_id).or_default().push(r.clone());
        }

        self.experiences
            .values()
            .map(|experience| ExperienceWithRatings {
                ratings: ratings.remove(&experience.id).unwrap_or_default(),
                experience: experience.clone(),
            })
            .collect()
    }

    fn event_with_relations(&self, id: EventId) -> Option<EventWithRelations> {
        let event = self.events.get(&id)?.clone();
        Some(EventWithRelations {
            attendees: self.attendees.values().filter(|a| a.event_id == id).cloned().collect(),
            ratings: self.event_ratings.values().filter(|r| r.event_id == id).cloned().collect(),
            event,
        })
    }

    fn created_at_or_after<T, F>(table: &Table<T>, since: Option<DateTime<Utc>>, created_at: F) -> u64
    where
        T: Entity + Clone,
        F: Fn(&T) -> DateTime<Utc>,
    {
        match since {
            None => table.len() as u64,
            Some(bound) => table.values().filter(|row| created_at(row) >= bound).count() as u64,
        }
    }
}

/// In-memory implementation of both store traits.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| StoreError::backend("read_lock", "in-memory store lock poisoned"))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| StoreError::backend("write_lock", "in-memory store lock poisoned"))
    }

    // Seeding helpers insert fully-formed records (explicit ids and timestamps).
    // Parent rows are not checked; callers seed parents first.

    pub fn seed_event(&self, event: Event) -> StoreResult<()> {
        self.write()?.events.insert(event);
        Ok(())
    }

    pub fn seed_experience(&self, experience: Experience) -> StoreResult<()> {
        self.write()?.experiences.insert(experience);
        Ok(())
    }

    pub fn seed_attendee(&self, attendee: Attendee) -> StoreResult<()> {
        self.write()?.attendees.insert(attendee);
        Ok(())
    }

    pub fn seed_event_rating(&self, rating: EventRating) -> StoreResult<()> {
        self.write()?.event_ratings.insert(rating);
        Ok(())
    }

    pub fn seed_experience_rating(&self, rating: ExperienceRating) -> StoreResult<()> {
        self.write()?.experience_ratings.insert(rating);
        Ok(())
    }
}

fn page_of<T>(rows: Vec<T>, page: PageRequest) -> Vec<T> {
    let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
    rows.into_iter().skip(offset).take(limit).collect()
}

fn event_ratings_mean(row: &EventWithRelations) -> eventhub_core::Mean {
    RatingTally::from_values(row.ratings.iter().map(|r| r.rating)).mean()
}

fn experience_ratings_mean(row: &ExperienceWithRatings) -> eventhub_core::Mean {
    RatingTally::from_values(row.ratings.iter().map(|r| r.rating)).mean()
}

#[async_trait]
impl ReportStore for InMemoryStore {
    async fn list_events(
        &self,
        order: OrderSpec,
        page: PageRequest,
    ) -> StoreResult<Vec<EventWithRelations>> {
        let mut rows = self.read()?.events_with_relations();
        let direction = order.direction();
        rows.sort_by(|a, b| {
            let primary = match order {
                OrderSpec::ByDate(_) => a.event.date.cmp(&b.event.date),
                OrderSpec::ByRatingMean(_) => event_ratings_mean(a).cmp(&event_ratings_mean(b)),
                OrderSpec::ByAttendeeCount(_) => a.attendees.len().cmp(&b.attendees.len()),
            };
            direction.apply(primary).then_with(|| a.event.id.cmp(&b.event.id))
        });
        Ok(page_of(rows, page))
    }

    async fn list_experiences(
        &self,
        order: ExperienceOrderSpec,
        page: PageRequest,
    ) -> StoreResult<Vec<ExperienceWithRatings>> {
        let mut rows = self.read()?.experiences_with_ratings();
        let direction = order.direction();
        rows.sort_by(|a, b| {
            let primary = match order {
                ExperienceOrderSpec::ByCreatedAt(_) => {
                    a.experience.created_at.cmp(&b.experience.created_at)
                }
                ExperienceOrderSpec::ByRatingMean(_) => {
                    experience_ratings_mean(a).cmp(&experience_ratings_mean(b))
                }
            };
            direction
                .apply(primary)
                .then_with(|| a.experience.id.cmp(&b.experience.id))
        });
        Ok(page_of(rows, page))
    }

    async fn count_matching(
        &self,
        kind: EntityKind,
        created_since: Option<DateTime<Utc>>,
    ) -> StoreResult<u64> {
        let t = self.read()?;
        let count = match kind {
            EntityKind::Event => Tables::created_at_or_after(&t.events, created_since, |r| r.created_at),
            EntityKind::Experience => {
                Tables::created_at_or_after(&t.experiences, created_since, |r| r.created_at)
            }
            EntityKind::Attendee => {
                Tables::created_at_or_after(&t.attendees, created_since, |r| r.created_at)
            }
            EntityKind::EventRating => {
                Tables::created_at_or_after(&t.event_ratings, created_since, |r| r.created_at)
            }
            EntityKind::ExperienceRating => {
                Tables::created_at_or_after(&t.experience_ratings, created_since, |r| r.created_at)
            }
        };
        Ok(count)
    }

    async fn rating_tally(&self, kind: RatedKind) -> StoreResult<RatingTally> {
        let t = self.read()?;
        let tally = match kind {
            RatedKind::Event => RatingTally::from_values(t.event_ratings.values().map(|r| r.rating)),
            RatedKind::Experience => {
                RatingTally::from_values(t.experience_ratings.values().map(|r| r.rating))
            }
        };
        Ok(tally)
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn create_event(&self, input: NewEvent) -> StoreResult<Event> {
        input.validate()?;
        let event = input.into_event(now());
        self.write()?.events.insert(event.clone());
        Ok(event)
    }

    async fn all_events(&self) -> StoreResult<Vec<Event>> {
        let mut events: Vec<Event> = self.read()?.events.values().cloned().collect();
        events.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn get_event(&self, id: EventId) -> StoreResult<Option<EventWithRelations>> {
        Ok(self.read()?.event_with_relations(id))
    }

    async fn update_event(&self, id: EventId, patch: EventPatch) -> StoreResult<Event> {
        patch.validate()?;
        let mut t = self.write()?;
        let event = t
            .events
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Event, id))?;
        patch.apply(event, now());
        Ok(event.clone())
    }

    async fn delete_event(&self, id: EventId) -> StoreResult<()> {
        let mut t = self.write()?;
        t.events
            .remove(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Event, id))?;
        t.attendees.retain(|a| a.event_id != id);
        t.event_ratings.retain(|r| r.event_id != id);
        Ok(())
    }

    async fn add_attendee(&self, input: NewAttendee) -> StoreResult<Attendee> {
        input.validate()?;
        let mut t = self.write()?;
        if !t.events.contains(&input.event_id) {
            return Err(StoreError::not_found(EntityKind::Event, input.event_id));
        }
        let attendee = input.into_attendee(now());
        t.attendees.insert(attendee.clone());
        Ok(attendee)
    }

    async fn attendees_for_event(&self, event_id: EventId) -> StoreResult<Vec<Attendee>> {
        let t = self.read()?;
        let mut attendees: Vec<Attendee> = t
            .attendees
            .values()
            .filter(|a| a.event_id == event_id)
            .cloned()
            .collect();
        attendees.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(attendees)
    }

    async fn remove_attendee(&self, id: AttendeeId) -> StoreResult<()> {
        self.write()?
            .attendees
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(EntityKind::Attendee, id))
    }

    async fn create_experience(&self, input: NewExperience) -> StoreResult<Experience> {
        input.validate()?;
        let experience = input.into_experience(now());
        self.write()?.experiences.insert(experience.clone());
        Ok(experience)
    }

    async fn all_experiences(&self) -> StoreResult<Vec<Experience>> {
        let mut experiences: Vec<Experience> = self.read()?.experiences.values().cloned().collect();
        experiences.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(experiences)
    }

    async fn get_experience(&self, id: ExperienceId) -> StoreResult<Option<ExperienceWithRatings>> {
        let t = self.read()?;
        Ok(t.experiences.get(&id).map(|experience| ExperienceWithRatings {
            experience: experience.clone(),
            ratings: t
                .experience_ratings
                .values()
                .filter(|r| r.experience_id == id)
                .cloned()
                .collect(),
        }))
    }

    async fn rate_event(&self, event_id: EventId, rating: RatingValue) -> StoreResult<EventRating> {
        let mut t = self.write()?;
        if !t.events.contains(&event_id) {
            return Err(StoreError::not_found(EntityKind::Event, event_id));
        }
        let row = EventRating {
            id: RatingId::new(),
            event_id,
            rating,
            created_at: now(),
        };
        t.event_ratings.insert(row.clone());
        Ok(row)
    }

    async fn rate_experience(
        &self,
        experience_id: ExperienceId,
        rating: RatingValue,
    ) -> StoreResult<ExperienceRating> {
        let mut t = self.write()?;
        if !t.experiences.contains(&experience_id) {
            return Err(StoreError::not_found(EntityKind::Experience, experience_id));
        }
        let row = ExperienceRating {
            id: RatingId::new(),
            experience_id,
            rating,
            created_at: now(),
        };
        t.experience_ratings.insert(row.clone());
        Ok(row)
    }
}
