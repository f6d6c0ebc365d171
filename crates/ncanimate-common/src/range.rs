//! Closed time intervals.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::{TimeIncrement, Timestamp};

/// A closed time interval, or the unbounded `AllTime` interval.
///
/// `AllTime` is only equal to itself: a bounded range with both bounds
/// missing is a different value. It sorts before every bounded range,
/// contains and overlaps everything, and absorbs anything it is merged with.
/// A missing bound on a `Bounded` range places no constraint on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RangeRepr", into = "RangeRepr")]
pub enum DateTimeRange {
    AllTime,
    Bounded {
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    },
}

impl DateTimeRange {
    /// Range with optional bounds. No bounds at all gives `AllTime`.
    pub fn create(start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        match (start, end) {
            (None, None) => DateTimeRange::AllTime,
            (start, end) => DateTimeRange::Bounded { start, end },
        }
    }

    pub fn bounded(start: Timestamp, end: Timestamp) -> Self {
        DateTimeRange::Bounded {
            start: Some(start),
            end: Some(end),
        }
    }

    /// The period of length `increment` starting at `start`.
    pub fn from_start(start: Timestamp, increment: &TimeIncrement) -> Self {
        if increment.is_eternity() {
            return DateTimeRange::AllTime;
        }
        DateTimeRange::Bounded {
            start: Some(start),
            end: increment.add_to(&start),
        }
    }

    pub fn is_all_time(&self) -> bool {
        matches!(self, DateTimeRange::AllTime)
    }

    pub fn start(&self) -> Option<Timestamp> {
        match self {
            DateTimeRange::AllTime => None,
            DateTimeRange::Bounded { start, .. } => *start,
        }
    }

    pub fn end(&self) -> Option<Timestamp> {
        match self {
            DateTimeRange::AllTime => None,
            DateTimeRange::Bounded { end, .. } => *end,
        }
    }

    /// The period following this one: `[end, end + increment]`.
    pub fn next(&self, increment: &TimeIncrement) -> Self {
        match self.end() {
            Some(end) if !self.is_all_time() => DateTimeRange::from_start(end, increment),
            _ => DateTimeRange::AllTime,
        }
    }

    /// `start <= t <= end`.
    pub fn contains(&self, t: &Timestamp) -> bool {
        match self {
            DateTimeRange::AllTime => true,
            DateTimeRange::Bounded { start, end } => {
                start.map_or(true, |s| s <= *t) && end.map_or(true, |e| *t <= e)
            }
        }
    }

    /// Both endpoints of `other` lie within this range.
    pub fn contains_range(&self, other: &DateTimeRange) -> bool {
        if self.is_all_time() {
            return true;
        }
        if other.is_all_time() {
            return false;
        }
        let start_ok = match (self.start(), other.start()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(_), Some(o)) => self.contains(&o),
        };
        let end_ok = match (self.end(), other.end()) {
            (_, None) => self.end().is_none(),
            (_, Some(o)) => self.contains(&o),
        };
        start_ok && end_ok
    }

    /// True when an endpoint of either range lies within the other.
    /// Touching ranges overlap.
    pub fn overlaps(&self, other: &DateTimeRange) -> bool {
        if self.is_all_time() || other.is_all_time() {
            return true;
        }
        let within = |range: &DateTimeRange, t: Option<Timestamp>| t.map_or(false, |t| range.contains(&t));

        within(self, other.start())
            || within(self, other.end())
            || within(other, self.start())
            || within(other, self.end())
    }

    /// Smallest range spanning both. A missing bound lets the other side win.
    pub fn merge(&self, other: &DateTimeRange) -> Self {
        if self.is_all_time() || other.is_all_time() {
            return DateTimeRange::AllTime;
        }
        let start = match (self.start(), other.start()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let end = match (self.end(), other.end()) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        DateTimeRange::create(start, end)
    }

    /// Merge overlapping ranges until the remaining ranges are pairwise
    /// disjoint.
    pub fn merge_all<I>(ranges: I) -> BTreeSet<DateTimeRange>
    where
        I: IntoIterator<Item = DateTimeRange>,
    {
        let mut pending: Vec<DateTimeRange> = ranges.into_iter().collect();
        let mut merged = BTreeSet::new();

        while !pending.is_empty() {
            let mut current = pending.remove(0);

            // A merge can grow `current` into ranges skipped earlier in the pass.
            loop {
                let before = pending.len();
                let mut i = 0;
                while i < pending.len() {
                    if current.overlaps(&pending[i]) {
                        let other = pending.remove(i);
                        current = current.merge(&other);
                    } else {
                        i += 1;
                    }
                }
                if pending.len() == before {
                    break;
                }
            }

            merged.insert(current);
        }

        merged
    }
}

fn cmp_missing_last(a: &Option<Timestamp>, b: &Option<Timestamp>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Ord for DateTimeRange {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (DateTimeRange::AllTime, DateTimeRange::AllTime) => Ordering::Equal,
            (DateTimeRange::AllTime, _) => Ordering::Less,
            (_, DateTimeRange::AllTime) => Ordering::Greater,
            (
                DateTimeRange::Bounded { start: s1, end: e1 },
                DateTimeRange::Bounded { start: s2, end: e2 },
            ) => cmp_missing_last(s1, s2).then_with(|| cmp_missing_last(e1, e2)),
        }
    }
}

impl PartialOrd for DateTimeRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DateTimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |t: Option<Timestamp>| t.map_or_else(|| "*".to_string(), |t| t.to_rfc3339());
        match self {
            DateTimeRange::AllTime => f.write_str("ALL_TIME"),
            DateTimeRange::Bounded { start, end } => write!(f, "{} - {}", bound(*start), bound(*end)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_date: Option<Timestamp>,
}

impl From<DateTimeRange> for RangeRepr {
    fn from(range: DateTimeRange) -> Self {
        RangeRepr {
            start_date: range.start(),
            end_date: range.end(),
        }
    }
}

impl From<RangeRepr> for DateTimeRange {
    fn from(repr: RangeRepr) -> Self {
        DateTimeRange::create(repr.start_date, repr.end_date)
    }
}
