//! Period filter for the summary report.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

/// Reporting window, bounded below by a creation timestamp.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    All,
    Month,
    Year,
}

impl Period {
    /// Unknown or absent values mean `all`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("month") => Period::Month,
            Some("year") => Period::Year,
            _ => Period::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::All => "all",
            Period::Month => "month",
            Period::Year => "year",
        }
    }

    /// First instant of the current calendar month/year in `now`'s time zone.
    ///
    /// `All` has no lower bound. Callers pass the server's local clock.
    pub fn lower_bound<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
        let start = match self {
            Period::All => return None,
            Period::Month => NaiveDate::from_ymd_opt(now.year(), now.month(), 1),
            Period::Year => NaiveDate::from_ymd_opt(now.year(), 1, 1),
        }?;
        let midnight = start.and_hms_opt(0, 0, 0)?;
        let tz = now.timezone();
        // An ambiguous local time resolves to the earlier instant.
        first_valid_instant(midnight, |local| {
            tz.from_local_datetime(local)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
        })
    }
}

const GAP_STEP_MINUTES: i64 = 15;
const GAP_SEARCH_STEPS: i64 = 24 * 60 / GAP_STEP_MINUTES;

/// First local time at or after `start` that `resolve` maps to an instant.
///
/// Midnight can fall inside a DST gap; the day then starts at the first local
/// time that exists.
fn first_valid_instant<F>(start: NaiveDateTime, resolve: F) -> Option<DateTime<Utc>>
where
    F: Fn(&NaiveDateTime) -> Option<DateTime<Utc>>,
{
    (0..=GAP_SEARCH_STEPS)
        .map(|step| start + Duration::minutes(step * GAP_STEP_MINUTES))
        .find_map(|local| resolve(&local))
}

impl core::fmt::Display for Period {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
