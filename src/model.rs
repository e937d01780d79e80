use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::EngineError;

/// Host-side relational id (class, teacher, venue, subject rows).
pub type ResourceId = i64;

/// Subject id in the prerequisite graph.
pub type SubjectId = i64;

/// A time-of-day window on a specific calendar day. Half-open `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Result<Self, EngineError> {
        if start >= end {
            return Err(EngineError::InvalidRange("time range start must precede end"));
        }
        Ok(Self { date, start, end })
    }

    /// True iff both ranges fall on the same day and their windows intersect.
    /// Back-to-back ranges (one ends exactly when the other starts) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.date == other.date && self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}..{}", self.date, self.start, self.end)
    }
}

/// A span of calendar days, half-open `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, EngineError> {
        if start >= end {
            return Err(EngineError::InvalidRange("date range start must precede end"));
        }
        Ok(Self { start, end })
    }

    /// True iff `inner` lies entirely within `self`. Boundary equality counts
    /// as containment.
    pub fn contains(&self, inner: &DateRange) -> bool {
        self.start <= inner.start && inner.end <= self.end
    }

    /// Half-open overlap: ranges that merely touch at an endpoint do not overlap.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Iterate every day in `[start, end)`.
    pub fn days(&self) -> Days {
        Days {
            cur: self.start,
            end: self.end,
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

pub struct Days {
    cur: NaiveDate,
    end: NaiveDate,
}

impl Iterator for Days {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.cur >= self.end {
            return None;
        }
        let day = self.cur;
        self.cur = self.cur.succ_opt()?;
        Some(day)
    }
}

/// A `(dimension, id)` pair naming what a booking occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKey {
    Class(ResourceId),
    Teacher(ResourceId),
    Venue(ResourceId),
}

impl ResourceKey {
    pub fn dimension(&self) -> &'static str {
        match self {
            ResourceKey::Class(_) => "class",
            ResourceKey::Teacher(_) => "teacher",
            ResourceKey::Venue(_) => "venue",
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::Class(id) => write!(f, "class:{id}"),
            ResourceKey::Teacher(id) => write!(f, "teacher:{id}"),
            ResourceKey::Venue(id) => write!(f, "venue:{id}"),
        }
    }
}

/// A candidate occupation of resources, before the store has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub time: TimeRange,
    pub resources: BTreeSet<ResourceKey>,
}

impl BookingRequest {
    pub fn new(time: TimeRange, resources: impl IntoIterator<Item = ResourceKey>) -> Self {
        Self {
            time,
            resources: resources.into_iter().collect(),
        }
    }
}

/// A committed booking. Ids are assigned by the store at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub time: TimeRange,
    pub resources: BTreeSet<ResourceKey>,
}

impl Booking {
    pub fn occupies(&self, key: &ResourceKey) -> bool {
        self.resources.contains(key)
    }
}

/// A named sub-range (a Term under its AcademicYear, or an AcademicYear under
/// its school's calendar).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundedRange {
    pub id: Ulid,
    pub name: Option<String>,
    pub range: DateRange,
}

/// A time-of-day template with a relative likelihood of being chosen during
/// bulk generation. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub weight: f64,
}

impl WeightedSlot {
    pub fn new(start: NaiveTime, end: NaiveTime, weight: f64) -> Result<Self, EngineError> {
        if start >= end {
            return Err(EngineError::InvalidRange("slot start must precede end"));
        }
        if !(weight > 0.0) {
            return Err(EngineError::InvalidRange("slot weight must be positive"));
        }
        Ok(Self { start, end, weight })
    }

    /// Instantiate the template on a concrete day.
    pub fn on(&self, date: NaiveDate) -> TimeRange {
        TimeRange {
            date,
            start: self.start,
            end: self.end,
        }
    }
}
