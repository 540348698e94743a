//! Sort resolution for the paged reports.
//!
//! Request parameters are resolved once into a closed `OrderSpec`, which the
//! store adapters consume without re-interpreting strings. Unknown keys never
//! fail: they fall back to ordering by date.

use core::cmp::Ordering;

/// Requested sort direction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// `asc` (any case) is ascending; anything else, including absence, is descending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// Orient an ascending comparison result in this direction.
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Resolved ordering for the events report.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OrderSpec {
    /// By the event's own date.
    ByDate(SortDirection),
    /// By the mean of the event's ratings (no ratings counts as 0).
    ByRatingMean(SortDirection),
    /// By the number of registered attendees.
    ByAttendeeCount(SortDirection),
}

impl OrderSpec {
    /// Resolve `sortBy`/`sortOrder` for events. Absent or unknown `sortBy` is `date`.
    pub fn for_events(sort_by: Option<&str>, sort_order: Option<&str>) -> Self {
        let direction = SortDirection::parse(sort_order);
        match normalized(sort_by).as_deref() {
            Some("rating") => OrderSpec::ByRatingMean(direction),
            Some("attendees") => OrderSpec::ByAttendeeCount(direction),
            _ => OrderSpec::ByDate(direction),
        }
    }

    pub fn direction(&self) -> SortDirection {
        match self {
            OrderSpec::ByDate(d) | OrderSpec::ByRatingMean(d) | OrderSpec::ByAttendeeCount(d) => *d,
        }
    }
}

impl Default for OrderSpec {
    fn default() -> Self {
        OrderSpec::ByDate(SortDirection::Desc)
    }
}

/// Resolved ordering for the experiences report.
///
/// Experiences have no event date; "date" means the creation timestamp.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ExperienceOrderSpec {
    ByCreatedAt(SortDirection),
    ByRatingMean(SortDirection),
}

impl ExperienceOrderSpec {
    /// Resolve `sortBy`/`sortOrder` for experiences.
    ///
    /// Absent `sortBy` means `rating`; an unrecognized value means `date`.
    pub fn for_experiences(sort_by: Option<&str>, sort_order: Option<&str>) -> Self {
        let direction = SortDirection::parse(sort_order);
        match normalized(sort_by).as_deref() {
            None | Some("rating") => ExperienceOrderSpec::ByRatingMean(direction),
            _ => ExperienceOrderSpec::ByCreatedAt(direction),
        }
    }

    pub fn direction(&self) -> SortDirection {
        match self {
            ExperienceOrderSpec::ByCreatedAt(d) | ExperienceOrderSpec::ByRatingMean(d) => *d,
        }
    }
}

impl Default for ExperienceOrderSpec {
    fn default() -> Self {
        ExperienceOrderSpec::ByRatingMean(SortDirection::Desc)
    }
}

fn normalized(raw: Option<&str>) -> Option<String> {
    raw.map(|s| s.trim().to_ascii_lowercase()).filter(|s| !s.is_empty())
}
