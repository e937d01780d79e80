//! Pure conflict detection over a snapshot of same-day bookings.
//!
//! Deterministic functions of their inputs: callers fetch the snapshot from
//! the store, inspect the result, and decide whether to persist. Under
//! concurrent callers the check is advisory; the store must enforce the real
//! no-double-booking invariant (see `BookingStore`).

use std::collections::BTreeSet;

use ulid::Ulid;

use crate::model::{Booking, BookingRequest, ResourceKey};

/// Return the subset of the candidate's resource keys that some existing
/// booking (other than `exclude`) occupies during an overlapping time range.
/// Empty set means no conflict.
pub fn find_conflicts(
    candidate: &BookingRequest,
    existing: &[Booking],
    exclude: Option<Ulid>,
) -> BTreeSet<ResourceKey> {
    let mut hits = BTreeSet::new();
    for booking in existing {
        if exclude == Some(booking.id) {
            continue;
        }
        if !booking.time.overlaps(&candidate.time) {
            continue;
        }
        for key in candidate.resources.intersection(&booking.resources) {
            hits.insert(*key);
        }
    }
    hits
}

/// First colliding `(resource, booking id)` pair, if any. Used where the
/// caller needs to name the offender (exam scheduling).
pub fn first_conflict(
    candidate: &BookingRequest,
    existing: &[Booking],
    exclude: Option<Ulid>,
) -> Option<(ResourceKey, Ulid)> {
    for booking in existing {
        if exclude == Some(booking.id) {
            continue;
        }
        if !booking.time.overlaps(&candidate.time) {
            continue;
        }
        if let Some(key) = candidate.resources.intersection(&booking.resources).next() {
            return Some((*key, booking.id));
        }
    }
    None
}

pub fn has_conflict(candidate: &BookingRequest, existing: &[Booking], exclude: Option<Ulid>) -> bool {
    first_conflict(candidate, existing, exclude).is_some()
}
