use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use std::collections::BTreeSet;
use ulid::Ulid;

use crate::error::EngineError;
use crate::model::{Booking, BookingRequest, ResourceKey};

/// Durable index of committed bookings, owned by the host persistence layer.
///
/// The engine's conflict checks read a snapshot through `query` and are
/// advisory under concurrency: two callers can both pass a check and both
/// commit. The store must enforce the real invariant — no two overlapping
/// bookings sharing a resource key — with an exclusion constraint or a
/// serializable transaction around `commit`/`replace`.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Bookings on `date` that occupy at least one of the given keys.
    async fn query(&self, date: NaiveDate, keys: &BTreeSet<ResourceKey>) -> Vec<Booking>;

    /// Persist a candidate. The store assigns the booking id.
    async fn commit(&self, request: BookingRequest) -> Booking;

    /// Full replacement of an existing booking, keeping its id. Callers
    /// re-run the conflict check (excluding `id`) before calling this.
    async fn replace(&self, id: Ulid, request: BookingRequest) -> Result<Booking, EngineError>;

    /// Delete a booking. No cascading effect beyond dropping it from the index.
    async fn remove(&self, id: Ulid) -> Option<Booking>;
}

/// Reference store keyed by day, with per-day lists kept sorted by start time.
/// Suitable for tests and single-process hosts; dashmap's shard locks
/// serialize same-day commits.
pub struct InMemoryStore {
    days: DashMap<NaiveDate, Vec<Booking>>,
    booking_to_day: DashMap<Ulid, NaiveDate>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            days: DashMap::new(),
            booking_to_day: DashMap::new(),
        }
    }

    pub fn booking_count(&self) -> usize {
        self.booking_to_day.len()
    }

    /// All bookings on a day, sorted by start time.
    pub fn day_snapshot(&self, date: NaiveDate) -> Vec<Booking> {
        self.days.get(&date).map(|e| e.value().clone()).unwrap_or_default()
    }

    fn insert_sorted(day: &mut Vec<Booking>, booking: Booking) {
        let pos = day.partition_point(|b| b.time.start < booking.time.start);
        day.insert(pos, booking);
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn query(&self, date: NaiveDate, keys: &BTreeSet<ResourceKey>) -> Vec<Booking> {
        match self.days.get(&date) {
            Some(day) => day
                .iter()
                .filter(|b| b.resources.iter().any(|k| keys.contains(k)))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    async fn commit(&self, request: BookingRequest) -> Booking {
        let booking = Booking {
            id: Ulid::new(),
            time: request.time,
            resources: request.resources,
        };
        let mut day = self.days.entry(booking.time.date).or_default();
        Self::insert_sorted(&mut day, booking.clone());
        drop(day);
        self.booking_to_day.insert(booking.id, booking.time.date);
        booking
    }

    async fn replace(&self, id: Ulid, request: BookingRequest) -> Result<Booking, EngineError> {
        let old_date = self
            .booking_to_day
            .get(&id)
            .map(|e| *e.value())
            .ok_or(EngineError::NotFound(id))?;
        if let Some(mut day) = self.days.get_mut(&old_date) {
            day.retain(|b| b.id != id);
        }
        let booking = Booking {
            id,
            time: request.time,
            resources: request.resources,
        };
        let mut day = self.days.entry(booking.time.date).or_default();
        Self::insert_sorted(&mut day, booking.clone());
        drop(day);
        self.booking_to_day.insert(id, booking.time.date);
        Ok(booking)
    }

    async fn remove(&self, id: Ulid) -> Option<Booking> {
        let (_, date) = self.booking_to_day.remove(&id)?;
        let mut day = self.days.get_mut(&date)?;
        let pos = day.iter().position(|b| b.id == id)?;
        Some(day.remove(pos))
    }
}
