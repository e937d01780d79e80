//! Single-booking exam scheduling: build one candidate occupying the class,
//! the examiner, and the venue (or lab), run one conflict check, and commit
//! through the store. Rescheduling re-runs the check excluding the exam's own
//! booking so it cannot conflict with itself.

use tracing::debug;
use ulid::Ulid;

use crate::conflict::first_conflict;
use crate::error::EngineError;
use crate::model::{Booking, BookingRequest, ResourceId, ResourceKey, TimeRange};
use crate::observability;
use crate::store::BookingStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamRequest {
    pub class: ResourceId,
    pub examiner: ResourceId,
    /// Venue or lab hosting the exam.
    pub venue: ResourceId,
    pub time: TimeRange,
}

impl ExamRequest {
    fn candidate(&self) -> BookingRequest {
        BookingRequest::new(
            self.time,
            [
                ResourceKey::Class(self.class),
                ResourceKey::Teacher(self.examiner),
                ResourceKey::Venue(self.venue),
            ],
        )
    }
}

pub struct ExamScheduler<'a, S> {
    store: &'a S,
}

impl<'a, S: BookingStore> ExamScheduler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Validate and commit a new exam booking, or report the first colliding
    /// resource and the booking holding it.
    pub async fn schedule(&self, request: &ExamRequest) -> Result<Booking, EngineError> {
        self.check_and_commit(request, None).await
    }

    /// Re-run the conflict check for an existing exam's new time/resources,
    /// excluding its current booking, then replace it in the store.
    pub async fn reschedule(
        &self,
        booking_id: Ulid,
        request: &ExamRequest,
    ) -> Result<Booking, EngineError> {
        self.check_and_commit(request, Some(booking_id)).await
    }

    async fn check_and_commit(
        &self,
        request: &ExamRequest,
        exclude: Option<Ulid>,
    ) -> Result<Booking, EngineError> {
        let candidate = request.candidate();
        let existing = self.store.query(candidate.time.date, &candidate.resources).await;

        if let Some((resource, booking_id)) = first_conflict(&candidate, &existing, exclude) {
            metrics::counter!(
                observability::CONFLICTS_DETECTED_TOTAL,
                "source" => "exam",
                "dimension" => resource.dimension()
            )
            .increment(1);
            debug!(%resource, %booking_id, time = %candidate.time, "exam slot collided");
            return Err(EngineError::Conflict {
                resource,
                booking_id,
            });
        }

        let booking = match exclude {
            Some(id) => self.store.replace(id, candidate).await?,
            None => self.store.commit(candidate).await,
        };
        metrics::counter!(observability::BOOKINGS_COMMITTED_TOTAL, "source" => "exam").increment(1);
        debug!(id = %booking.id, time = %booking.time, "exam booked");
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use chrono::{NaiveDate, NaiveTime};

    fn tr(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> TimeRange {
        TimeRange::new(
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            NaiveTime::from_hms_opt(start_h, start_m, 0).unwrap(),
            NaiveTime::from_hms_opt(end_h, end_m, 0).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn exam_books_when_free() {
        let store = InMemoryStore::new();
        let scheduler = ExamScheduler::new(&store);
        let exam = ExamRequest {
            class: 7,
            examiner: 3,
            venue: 12,
            time: tr(9, 0, 11, 0),
        };
        let booking = scheduler.schedule(&exam).await.unwrap();
        assert!(booking.occupies(&ResourceKey::Class(7)));
        assert!(booking.occupies(&ResourceKey::Teacher(3)));
        assert!(booking.occupies(&ResourceKey::Venue(12)));
        assert_eq!(store.booking_count(), 1);
    }

    #[tokio::test]
    async fn overlapping_class_rejected() {
        let store = InMemoryStore::new();
        let scheduler = ExamScheduler::new(&store);
        let first = scheduler
            .schedule(&ExamRequest { class: 7, examiner: 3, venue: 12, time: tr(9, 0, 11, 0) })
            .await
            .unwrap();

        // Same class, different examiner/venue, overlapping 10:30-12:00.
        let err = scheduler
            .schedule(&ExamRequest { class: 7, examiner: 4, venue: 13, time: tr(10, 30, 12, 0) })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Conflict { resource: ResourceKey::Class(7), booking_id } if booking_id == first.id
        ));
        assert_eq!(store.booking_count(), 1); // nothing persisted on rejection
    }

    #[tokio::test]
    async fn different_class_and_venue_coexist() {
        let store = InMemoryStore::new();
        let scheduler = ExamScheduler::new(&store);
        scheduler
            .schedule(&ExamRequest { class: 7, examiner: 3, venue: 12, time: tr(9, 0, 11, 0) })
            .await
            .unwrap();
        // Class 9, same date/time, different venue and examiner.
        scheduler
            .schedule(&ExamRequest { class: 9, examiner: 4, venue: 13, time: tr(9, 0, 11, 0) })
            .await
            .unwrap();
        assert_eq!(store.booking_count(), 2);
    }

    #[tokio::test]
    async fn back_to_back_exams_coexist() {
        let store = InMemoryStore::new();
        let scheduler = ExamScheduler::new(&store);
        scheduler
            .schedule(&ExamRequest { class: 7, examiner: 3, venue: 12, time: tr(9, 0, 10, 30) })
            .await
            .unwrap();
        scheduler
            .schedule(&ExamRequest { class: 7, examiner: 3, venue: 12, time: tr(10, 30, 12, 0) })
            .await
            .unwrap();
        assert_eq!(store.booking_count(), 2);
    }

    #[tokio::test]
    async fn reschedule_does_not_conflict_with_itself() {
        let store = InMemoryStore::new();
        let scheduler = ExamScheduler::new(&store);
        let exam = ExamRequest { class: 7, examiner: 3, venue: 12, time: tr(9, 0, 11, 0) };
        let booking = scheduler.schedule(&exam).await.unwrap();

        // Shift by half an hour; overlaps its own previous range.
        let shifted = ExamRequest { time: tr(9, 30, 11, 30), ..exam };
        let updated = scheduler.reschedule(booking.id, &shifted).await.unwrap();
        assert_eq!(updated.id, booking.id);
        assert_eq!(updated.time, shifted.time);
        assert_eq!(store.booking_count(), 1);
    }

    #[tokio::test]
    async fn reschedule_still_collides_with_others() {
        let store = InMemoryStore::new();
        let scheduler = ExamScheduler::new(&store);
        let stay = scheduler
            .schedule(&ExamRequest { class: 7, examiner: 3, venue: 12, time: tr(9, 0, 11, 0) })
            .await
            .unwrap();
        let moving = scheduler
            .schedule(&ExamRequest { class: 7, examiner: 4, venue: 13, time: tr(13, 0, 15, 0) })
            .await
            .unwrap();

        let onto_morning =
            ExamRequest { class: 7, examiner: 4, venue: 13, time: tr(10, 0, 12, 0) };
        let err = scheduler.reschedule(moving.id, &onto_morning).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Conflict { resource: ResourceKey::Class(7), booking_id } if booking_id == stay.id
        ));
    }

    #[tokio::test]
    async fn reschedule_unknown_booking_fails() {
        let store = InMemoryStore::new();
        let scheduler = ExamScheduler::new(&store);
        let exam = ExamRequest { class: 7, examiner: 3, venue: 12, time: tr(9, 0, 11, 0) };
        let result = scheduler.reschedule(Ulid::new(), &exam).await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }
}
