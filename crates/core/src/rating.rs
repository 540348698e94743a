//! Star rating values.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A single star rating, always within `1..=5`.
///
/// Construction is the only validation point; every average computed from a
/// set of `RatingValue`s can assume the range holds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct RatingValue(u8);

impl RatingValue {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> DomainResult<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(DomainError::validation(format!(
                "rating must be between {} and {}, got {value}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for RatingValue {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RatingValue> for u8 {
    fn from(value: RatingValue) -> Self {
        value.0
    }
}
