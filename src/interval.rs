//! Calendar interval kinds and bucket bounds
//!
//! Every instant belongs to exactly one bucket per [`IntervalKind`]. A bucket is
//! described by a closed [`TimeRange`] whose end sits one [`TICK`] before the next
//! bucket's start, so adjacent buckets never overlap and never leave a gap.
//! Weeks start on Monday.

use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{StatsError, StatsResult};

/// Smallest representable step between two bucket boundaries.
pub const TICK: Duration = Duration::microseconds(1);

/// Calendar interval used to bucket records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalKind {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl IntervalKind {
    /// All supported kinds, finest first
    pub const ALL: [IntervalKind; 6] = [
        Self::Minute,
        Self::Hour,
        Self::Day,
        Self::Week,
        Self::Month,
        Self::Year,
    ];

    /// Singular name, as used by snapshot accessors (`for_day`, `this_week`)
    pub fn name(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Plural name, as used by time series requests (`"days"`)
    pub fn plural(self) -> &'static str {
        match self {
            Self::Minute => "minutes",
            Self::Hour => "hours",
            Self::Day => "days",
            Self::Week => "weeks",
            Self::Month => "months",
            Self::Year => "years",
        }
    }

    /// Parse the plural form accepted at the time series level.
    pub fn from_plural(name: &str) -> StatsResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.plural() == name)
            .ok_or_else(|| StatsError::invalid_interval(name))
    }

    /// Bounds of the bucket containing `instant`.
    pub fn bounds(self, instant: impl IntoInstant) -> TimeRange {
        let dt = instant.into_instant();
        let midnight = dt.date().and_time(NaiveTime::MIN);

        let weekday = i64::from(dt.weekday().num_days_from_monday());

        let start = match self {
            Self::Minute => {
                midnight + Duration::minutes(i64::from(dt.hour() * 60 + dt.minute()))
            }
            Self::Hour => midnight + Duration::hours(i64::from(dt.hour())),
            Self::Day => midnight,
            // The first representable week is cut short at NaiveDateTime::MIN.
            Self::Week => midnight
                .checked_sub_signed(Duration::days(weekday))
                .unwrap_or(NaiveDateTime::MIN),
            Self::Month => first_of_month(dt.date()).and_time(NaiveTime::MIN),
            Self::Year => first_of_year(dt.date()).and_time(NaiveTime::MIN),
        };
        let next = match self {
            Self::Week => midnight.checked_add_signed(Duration::days(7 - weekday)),
            _ => self.checked_advance(start),
        };

        // Likewise the last one runs up to NaiveDateTime::MAX.
        TimeRange {
            start,
            end: next.map_or(NaiveDateTime::MAX, |next| next - TICK),
        }
    }

    /// Step `instant` forward by exactly one unit of this interval.
    ///
    /// Months and years use calendar arithmetic: the day of month is kept when
    /// it exists in the target month and clamped to its last day otherwise.
    /// Saturates at the largest representable instant.
    pub fn advance(self, instant: NaiveDateTime) -> NaiveDateTime {
        self.checked_advance(instant).unwrap_or(NaiveDateTime::MAX)
    }

    fn checked_advance(self, instant: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Self::Minute => instant.checked_add_signed(Duration::minutes(1)),
            Self::Hour => instant.checked_add_signed(Duration::hours(1)),
            Self::Day => instant.checked_add_signed(Duration::days(1)),
            Self::Week => instant.checked_add_signed(Duration::weeks(1)),
            Self::Month => instant.checked_add_months(Months::new(1)),
            Self::Year => instant.checked_add_months(Months::new(12)),
        }
    }

    /// Bucket starts from the bucket containing `start` up to, but excluding, `end`.
    pub fn buckets(self, start: impl IntoInstant, end: impl IntoInstant) -> Vec<NaiveDateTime> {
        let end = end.into_instant();
        let mut current = self.bounds(start).start;
        let mut buckets = Vec::new();

        while current < end {
            buckets.push(current);
            let next = self.advance(current);
            if next == current {
                break;
            }
            current = next;
        }
        buckets
    }
}

impl fmt::Display for IntervalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IntervalKind {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| StatsError::invalid_interval(s))
    }
}

/// Closed range covering one bucket: `start <= t <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// First instant of the following bucket, saturating at `NaiveDateTime::MAX`
    pub fn next_start(&self) -> NaiveDateTime {
        self.end
            .checked_add_signed(TICK)
            .unwrap_or(NaiveDateTime::MAX)
    }
}

/// Bounds of the bucket `instant` falls into for `kind`.
pub fn bounds(instant: impl IntoInstant, kind: IntervalKind) -> TimeRange {
    kind.bounds(instant)
}

/// Like [`bounds`], with the interval given by its singular name.
pub fn bounds_named(instant: impl IntoInstant, interval: &str) -> StatsResult<TimeRange> {
    let kind: IntervalKind = interval.parse()?;
    Ok(kind.bounds(instant))
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

fn first_of_year(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.ordinal0()))
}

/// Anything that can stand in for a naive instant. Dates mean midnight.
pub trait IntoInstant {
    fn into_instant(self) -> NaiveDateTime;
}

impl IntoInstant for NaiveDateTime {
    fn into_instant(self) -> NaiveDateTime {
        self
    }
}

impl IntoInstant for NaiveDate {
    fn into_instant(self) -> NaiveDateTime {
        self.and_time(NaiveTime::MIN)
    }
}

impl<Tz: TimeZone> IntoInstant for DateTime<Tz> {
    fn into_instant(self) -> NaiveDateTime {
        self.naive_local()
    }
}
