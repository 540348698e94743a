//! Rating metrics: per-entity averages and the summary averages.
//!
//! Averages are kept as exact rationals (`sum / count`) until the very last
//! step, where they are rounded half-up to one decimal place. This keeps the
//! rounding faithful to the decimal value (no `2.45 -> 2.4` float artefacts)
//! and lets callers order entities by their exact mean.

use core::cmp::Ordering;

use serde::Serialize;

use crate::rating::RatingValue;

/// Running sum and count of a set of ratings.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RatingTally {
    pub sum: u64,
    pub count: u64,
}

impl RatingTally {
    pub fn new(sum: u64, count: u64) -> Self {
        Self { sum, count }
    }

    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = RatingValue>,
    {
        values.into_iter().fold(Self::default(), |mut tally, v| {
            tally.push(v);
            tally
        })
    }

    pub fn push(&mut self, value: RatingValue) {
        self.sum += u64::from(value.get());
        self.count += 1;
    }

    /// Exact mean; an empty tally has mean 0.
    pub fn mean(&self) -> Mean {
        if self.count == 0 {
            Mean::ZERO
        } else {
            Mean::new(u128::from(self.sum), u128::from(self.count))
        }
    }

    /// Mean rounded to one decimal place.
    pub fn average(&self) -> f64 {
        self.mean().rounded()
    }
}

/// Exact non-negative rational mean.
#[derive(Debug, Copy, Clone)]
pub struct Mean {
    num: u128,
    den: u128,
}

impl Mean {
    pub const ZERO: Mean = Mean { num: 0, den: 1 };

    fn new(num: u128, den: u128) -> Self {
        debug_assert!(den > 0);
        Self { num, den }
    }

    /// Unweighted midpoint of two means: `(a + b) / 2`.
    pub fn midpoint(a: Mean, b: Mean) -> Mean {
        Mean::new(a.num * b.den + b.num * a.den, 2 * a.den * b.den)
    }

    /// Value in tenths, rounded half-up: `floor((20n + d) / 2d)`.
    pub fn rounded_tenths(&self) -> u64 {
        ((20 * self.num + self.den) / (2 * self.den)) as u64
    }

    pub fn rounded(&self) -> f64 {
        self.rounded_tenths() as f64 / 10.0
    }
}

impl PartialEq for Mean {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Mean {}

impl PartialOrd for Mean {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Mean {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.num * other.den).cmp(&(other.num * self.den))
    }
}

/// Per-entity rating annotation attached to report rows.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetrics {
    pub average_rating: f64,
    pub rating_count: u64,
}

impl EntityMetrics {
    pub fn from_tally(tally: RatingTally) -> Self {
        Self {
            average_rating: tally.average(),
            rating_count: tally.count,
        }
    }
}

/// The three average figures of the summary report.
///
/// `average_rating` is the unweighted mean of the two per-kind means, not the
/// pooled mean of every rating row. Callers depend on this exact figure.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingAverages {
    pub average_rating: f64,
    pub average_event_rating: f64,
    pub average_experience_rating: f64,
}

impl RatingAverages {
    pub fn combine(events: RatingTally, experiences: RatingTally) -> Self {
        let event_mean = events.mean();
        let experience_mean = experiences.mean();
        Self {
            average_rating: Mean::midpoint(event_mean, experience_mean).rounded(),
            average_event_rating: event_mean.rounded(),
            average_experience_rating: experience_mean.rounded(),
        }
    }
}
