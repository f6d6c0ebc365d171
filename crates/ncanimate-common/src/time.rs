//! Time increments and timestamp parsing.
//!
//! Timestamps carry the product's fixed UTC offset so calendar stepping
//! (months, years, Jan 1 alignment) happens in the product time zone.
//! Equality and ordering compare instants, whatever the offset.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{NcAnimateError, NcAnimateResult};

/// A point in time expressed in a product time zone.
pub type Timestamp = DateTime<FixedOffset>;

/// Unit of a [`TimeIncrement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeIncrementUnit {
    Minute,
    Hour,
    Day,
    Month,
    Year,
    /// No periodic slicing: one slot covering all time.
    Eternity,
}

impl TimeIncrementUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeIncrementUnit::Minute => "MINUTE",
            TimeIncrementUnit::Hour => "HOUR",
            TimeIncrementUnit::Day => "DAY",
            TimeIncrementUnit::Month => "MONTH",
            TimeIncrementUnit::Year => "YEAR",
            TimeIncrementUnit::Eternity => "ETERNITY",
        }
    }
}

impl FromStr for TimeIncrementUnit {
    type Err = NcAnimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MINUTE" => Ok(TimeIncrementUnit::Minute),
            "HOUR" => Ok(TimeIncrementUnit::Hour),
            "DAY" => Ok(TimeIncrementUnit::Day),
            "MONTH" => Ok(TimeIncrementUnit::Month),
            "YEAR" => Ok(TimeIncrementUnit::Year),
            "ETERNITY" => Ok(TimeIncrementUnit::Eternity),
            _ => Err(NcAnimateError::UnsupportedTimeIncrement(s.to_string())),
        }
    }
}

impl TryFrom<String> for TimeIncrementUnit {
    type Error = NcAnimateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeIncrementUnit> for String {
    fn from(unit: TimeIncrementUnit) -> Self {
        unit.as_str().to_string()
    }
}

impl fmt::Display for TimeIncrementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_increment() -> u32 {
    1
}

/// A periodic step, e.g. 1 HOUR or 3 MONTH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeIncrement {
    #[serde(default = "default_increment")]
    pub increment: u32,
    pub unit: TimeIncrementUnit,
}

impl TimeIncrement {
    pub fn new(increment: u32, unit: TimeIncrementUnit) -> Self {
        Self { increment, unit }
    }

    pub fn minutes(increment: u32) -> Self {
        Self::new(increment, TimeIncrementUnit::Minute)
    }

    pub fn hours(increment: u32) -> Self {
        Self::new(increment, TimeIncrementUnit::Hour)
    }

    pub fn days(increment: u32) -> Self {
        Self::new(increment, TimeIncrementUnit::Day)
    }

    pub fn months(increment: u32) -> Self {
        Self::new(increment, TimeIncrementUnit::Month)
    }

    pub fn years(increment: u32) -> Self {
        Self::new(increment, TimeIncrementUnit::Year)
    }

    pub fn eternity() -> Self {
        Self::new(1, TimeIncrementUnit::Eternity)
    }

    pub fn is_eternity(&self) -> bool {
        self.unit == TimeIncrementUnit::Eternity
    }

    /// Reject increments that would never advance.
    pub fn validate(&self) -> NcAnimateResult<()> {
        if !self.is_eternity() && self.increment == 0 {
            return Err(NcAnimateError::InvalidConfig(format!(
                "Time increment of zero {}",
                self.unit
            )));
        }
        Ok(())
    }

    /// Step forward by one increment, calendar-aware.
    ///
    /// Returns `None` for ETERNITY (and on overflow).
    pub fn add_to(&self, t: &Timestamp) -> Option<Timestamp> {
        let n = self.increment;
        match self.unit {
            TimeIncrementUnit::Minute => t.checked_add_signed(Duration::minutes(i64::from(n))),
            TimeIncrementUnit::Hour => t.checked_add_signed(Duration::hours(i64::from(n))),
            TimeIncrementUnit::Day => t.checked_add_days(Days::new(u64::from(n))),
            TimeIncrementUnit::Month => t.checked_add_months(Months::new(n)),
            TimeIncrementUnit::Year => t.checked_add_months(Months::new(n.checked_mul(12)?)),
            TimeIncrementUnit::Eternity => None,
        }
    }

    /// Step backward by one increment, calendar-aware.
    pub fn subtract_from(&self, t: &Timestamp) -> Option<Timestamp> {
        let n = self.increment;
        match self.unit {
            TimeIncrementUnit::Minute => t.checked_sub_signed(Duration::minutes(i64::from(n))),
            TimeIncrementUnit::Hour => t.checked_sub_signed(Duration::hours(i64::from(n))),
            TimeIncrementUnit::Day => t.checked_sub_days(Days::new(u64::from(n))),
            TimeIncrementUnit::Month => t.checked_sub_months(Months::new(n)),
            TimeIncrementUnit::Year => t.checked_sub_months(Months::new(n.checked_mul(12)?)),
            TimeIncrementUnit::Eternity => None,
        }
    }

    /// Human readable period label, as displayed in product titles.
    pub fn label(&self) -> &'static str {
        match self.unit {
            TimeIncrementUnit::Minute => "Minute",
            TimeIncrementUnit::Hour => "Hourly",
            TimeIncrementUnit::Day => "Daily",
            TimeIncrementUnit::Month => "Monthly",
            TimeIncrementUnit::Year => "Yearly",
            TimeIncrementUnit::Eternity => "Overall",
        }
    }

    /// Date fragment used in output filenames for a file starting at `t`.
    pub fn filename_date(&self, t: &Timestamp) -> String {
        match self.unit {
            TimeIncrementUnit::Minute | TimeIncrementUnit::Hour => t.format("%Y-%m-%d_%Hh%M").to_string(),
            TimeIncrementUnit::Day | TimeIncrementUnit::Eternity => t.format("%Y-%m-%d").to_string(),
            TimeIncrementUnit::Month => t.format("%Y-%m").to_string(),
            TimeIncrementUnit::Year => format!("{:04}", t.year()),
        }
    }
}

impl fmt::Display for TimeIncrement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_eternity() {
            write!(f, "{}", self.unit)
        } else {
            write!(f, "{} {}", self.increment, self.unit)
        }
    }
}

/// Build the fixed offset of a product time zone.
pub fn fixed_offset(utc_offset_minutes: i32) -> NcAnimateResult<FixedOffset> {
    utc_offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            NcAnimateError::InvalidConfig(format!("Invalid UTC offset: {} minutes", utc_offset_minutes))
        })
}

/// Midnight on the 1st of January of the year of `t`, in the offset of `t`.
pub fn start_of_year(t: &Timestamp) -> Option<Timestamp> {
    let midnight = NaiveDate::from_ymd_opt(t.year(), 1, 1)?.and_hms_opt(0, 0, 0)?;
    t.offset().from_local_datetime(&midnight).single()
}

/// Parse an ISO 8601 date or date-time into the given time zone.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (read as local time in
/// `offset`), or a bare `YYYY-MM-DD` (local midnight).
pub fn parse_iso8601(s: &str, offset: &FixedOffset) -> NcAnimateResult<Timestamp> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(offset));
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        });

    naive
        .and_then(|ndt| offset.from_local_datetime(&ndt).single())
        .ok_or_else(|| NcAnimateError::InvalidDate(s.to_string()))
}
