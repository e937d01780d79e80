//! Bulk timetable generation: one class, a catalog of subjects to place each
//! school day, pools of teachers and venues, and a weighted slot catalog.
//!
//! Slots are drawn with weight-proportional probability (cumulative weight +
//! uniform draw) from an injected `Rng`, so tests seed a `StdRng` and get
//! reproducible runs. Each conflict-free candidate is committed through the
//! store immediately, which makes it visible to every later pick in the same
//! run. A colliding candidate is recorded in `skipped` and the run continues;
//! partial success is the expected outcome, not an error.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Weekday};
use rand::Rng;
use tracing::{debug, info};
use ulid::Ulid;

use crate::conflict::first_conflict;
use crate::error::EngineError;
use crate::limits::*;
use crate::model::{Booking, BookingRequest, DateRange, ResourceId, ResourceKey, SubjectId, WeightedSlot};
use crate::observability;
use crate::store::BookingStore;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub class: ResourceId,
    /// Subjects to place once per school day.
    pub subjects: Vec<SubjectId>,
    pub teachers: Vec<ResourceId>,
    pub venues: Vec<ResourceId>,
    pub window: DateRange,
    pub slots: Vec<WeightedSlot>,
    /// Days of the week on which to generate. Defaults to Mon-Fri.
    pub school_days: Vec<Weekday>,
}

impl GenerationRequest {
    pub fn new(
        class: ResourceId,
        subjects: Vec<SubjectId>,
        teachers: Vec<ResourceId>,
        venues: Vec<ResourceId>,
        window: DateRange,
        slots: Vec<WeightedSlot>,
    ) -> Self {
        Self {
            class,
            subjects,
            teachers,
            venues,
            window,
            slots,
            school_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.subjects.is_empty() {
            return Err(EngineError::MalformedRequest("no subjects to place"));
        }
        if self.slots.is_empty() {
            return Err(EngineError::MalformedRequest("empty slot catalog"));
        }
        if self.teachers.is_empty() {
            return Err(EngineError::MalformedRequest("empty teacher pool"));
        }
        if self.venues.is_empty() {
            return Err(EngineError::MalformedRequest("empty venue pool"));
        }
        if self.school_days.is_empty() {
            return Err(EngineError::MalformedRequest("no school days selected"));
        }
        if self.subjects.len() > MAX_SUBJECTS_PER_REQUEST {
            return Err(EngineError::MalformedRequest("too many subjects"));
        }
        if self.slots.len() > MAX_SLOTS_PER_REQUEST {
            return Err(EngineError::MalformedRequest("too many slots"));
        }
        if self.teachers.len() > MAX_POOL_SIZE || self.venues.len() > MAX_POOL_SIZE {
            return Err(EngineError::MalformedRequest("pool too large"));
        }
        let days = self
            .window
            .end
            .signed_duration_since(self.window.start)
            .num_days();
        if days > MAX_GENERATION_DAYS as i64 {
            return Err(EngineError::MalformedRequest("generation window too wide"));
        }
        for slot in &self.slots {
            // Re-validate in case the caller built slots without the constructor.
            WeightedSlot::new(slot.start, slot.end, slot.weight)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Every slot in the catalog was already used for this class on this day.
    SlotsExhausted,
    /// The drawn candidate collided with an existing booking.
    Conflict {
        resource: ResourceKey,
        booking_id: Ulid,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub subject: SubjectId,
    pub date: NaiveDate,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationResult {
    pub created: Vec<Booking>,
    pub skipped: Vec<Skipped>,
}

impl GenerationResult {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub struct ScheduleGenerator<'a, S> {
    store: &'a S,
}

impl<'a, S: BookingStore> ScheduleGenerator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Generate bookings for every (school day, subject) pair in the window.
    ///
    /// The only hard failure is a malformed request, raised before any
    /// booking is attempted. Per-item collisions land in `skipped`.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        rng: &mut (impl Rng + ?Sized),
    ) -> Result<GenerationResult, EngineError> {
        request.validate()?;
        metrics::counter!(observability::GENERATION_RUNS_TOTAL).increment(1);

        let mut result = GenerationResult::default();
        for date in request.window.days() {
            if !request.school_days.contains(&date.weekday()) {
                continue;
            }
            self.generate_day(request, date, rng, &mut result).await;
        }

        metrics::histogram!(observability::GENERATION_CREATED_PER_RUN)
            .record(result.created.len() as f64);
        info!(
            class = request.class,
            created = result.created.len(),
            skipped = result.skipped.len(),
            "timetable generation finished"
        );
        Ok(result)
    }

    async fn generate_day(
        &self,
        request: &GenerationRequest,
        date: NaiveDate,
        rng: &mut (impl Rng + ?Sized),
        result: &mut GenerationResult,
    ) {
        // Slots already holding a lesson for this class today.
        let mut used_slots: HashSet<usize> = HashSet::new();

        for &subject in &request.subjects {
            let available: Vec<usize> = (0..request.slots.len())
                .filter(|i| !used_slots.contains(i))
                .collect();
            let Some(slot_idx) = pick_weighted(&available, &request.slots, rng) else {
                metrics::counter!(observability::GENERATION_SKIPPED_TOTAL, "reason" => "slots_exhausted")
                    .increment(1);
                result.skipped.push(Skipped {
                    subject,
                    date,
                    reason: SkipReason::SlotsExhausted,
                });
                continue;
            };

            let teacher = request.teachers[rng.random_range(0..request.teachers.len())];
            let venue = request.venues[rng.random_range(0..request.venues.len())];
            let candidate = BookingRequest::new(
                request.slots[slot_idx].on(date),
                [
                    ResourceKey::Class(request.class),
                    ResourceKey::Teacher(teacher),
                    ResourceKey::Venue(venue),
                ],
            );

            let existing = self.store.query(date, &candidate.resources).await;
            match first_conflict(&candidate, &existing, None) {
                Some((resource, booking_id)) => {
                    metrics::counter!(observability::GENERATION_SKIPPED_TOTAL, "reason" => "conflict")
                        .increment(1);
                    metrics::counter!(
                        observability::CONFLICTS_DETECTED_TOTAL,
                        "source" => "generator",
                        "dimension" => resource.dimension()
                    )
                    .increment(1);
                    debug!(%resource, %booking_id, subject, %date, "candidate slot collided");
                    result.skipped.push(Skipped {
                        subject,
                        date,
                        reason: SkipReason::Conflict {
                            resource,
                            booking_id,
                        },
                    });
                }
                None => {
                    let booking = self.store.commit(candidate).await;
                    metrics::counter!(observability::BOOKINGS_COMMITTED_TOTAL, "source" => "generator")
                        .increment(1);
                    debug!(id = %booking.id, subject, %date, "lesson booked");
                    used_slots.insert(slot_idx);
                    result.created.push(booking);
                }
            }
        }
    }
}

/// Weight-proportional draw over the still-available slot indices:
/// a uniform sample against the cumulative weight. `None` when exhausted.
fn pick_weighted(
    available: &[usize],
    slots: &[WeightedSlot],
    rng: &mut (impl Rng + ?Sized),
) -> Option<usize> {
    let (&last, _) = available.split_last()?;
    let total: f64 = available.iter().map(|&i| slots[i].weight).sum();
    let mut draw = rng.random_range(0.0..total);
    for &i in available {
        draw -= slots[i].weight;
        if draw < 0.0 {
            return Some(i);
        }
    }
    // Float underflow in the subtraction chain lands on the final slot.
    Some(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use chrono::NaiveTime;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn slot(start_h: u32, end_h: u32, weight: f64) -> WeightedSlot {
        WeightedSlot::new(t(start_h, 0), t(end_h, 0), weight).unwrap()
    }

    /// Mon 2025-03-10 through Fri, half-open through Saturday.
    fn school_week() -> DateRange {
        DateRange::new(d(10), d(15)).unwrap()
    }

    fn base_request() -> GenerationRequest {
        GenerationRequest::new(
            7,
            vec![101, 102],
            vec![1, 2],
            vec![11, 12],
            school_week(),
            vec![slot(9, 10, 1.0), slot(10, 11, 1.0), slot(11, 12, 1.0)],
        )
    }

    #[tokio::test]
    async fn empty_catalogs_are_malformed() {
        let store = InMemoryStore::new();
        let generator = ScheduleGenerator::new(&store);
        let mut rng = StdRng::seed_from_u64(1);

        for broken in [
            GenerationRequest { subjects: vec![], ..base_request() },
            GenerationRequest { slots: vec![], ..base_request() },
            GenerationRequest { teachers: vec![], ..base_request() },
            GenerationRequest { venues: vec![], ..base_request() },
            GenerationRequest { school_days: vec![], ..base_request() },
        ] {
            let result = generator.generate(&broken, &mut rng).await;
            assert!(matches!(result, Err(EngineError::MalformedRequest(_))));
        }
        assert_eq!(store.booking_count(), 0);
    }

    #[tokio::test]
    async fn full_week_places_every_subject() {
        let store = InMemoryStore::new();
        let generator = ScheduleGenerator::new(&store);
        let mut rng = StdRng::seed_from_u64(7);

        // One teacher and one venue: non-overlapping slots keep this collision-free.
        let request = GenerationRequest::new(
            7,
            vec![101, 102],
            vec![1],
            vec![11],
            school_week(),
            vec![slot(9, 10, 1.0), slot(10, 11, 1.0), slot(11, 12, 1.0)],
        );
        let result = generator.generate(&request, &mut rng).await.unwrap();
        assert!(result.is_complete());
        assert_eq!(result.created.len(), 10); // 5 weekdays x 2 subjects
        assert_eq!(store.booking_count(), 10);
    }

    #[tokio::test]
    async fn weekend_days_are_skipped() {
        let store = InMemoryStore::new();
        let generator = ScheduleGenerator::new(&store);
        let mut rng = StdRng::seed_from_u64(7);

        // Mon through Sun: still only 5 generation days.
        let request = GenerationRequest {
            window: DateRange::new(d(10), d(17)).unwrap(),
            subjects: vec![101],
            teachers: vec![1],
            venues: vec![11],
            ..base_request()
        };
        let result = generator.generate(&request, &mut rng).await.unwrap();
        assert_eq!(result.created.len(), 5);
        for booking in &result.created {
            assert!(request.school_days.contains(&booking.time.date.weekday()));
        }
    }

    #[tokio::test]
    async fn more_subjects_than_slots_partially_succeeds() {
        let store = InMemoryStore::new();
        let generator = ScheduleGenerator::new(&store);
        let mut rng = StdRng::seed_from_u64(3);

        // 3 subjects a day, only 2 non-overlapping slots: one skip per day.
        let request = GenerationRequest::new(
            7,
            vec![101, 102, 103],
            vec![1],
            vec![11],
            school_week(),
            vec![slot(9, 10, 1.0), slot(10, 11, 2.0)],
        );
        let result = generator.generate(&request, &mut rng).await.unwrap();
        assert_eq!(result.created.len(), 10);
        assert_eq!(result.skipped.len(), 5);
        for skip in &result.skipped {
            assert_eq!(skip.reason, SkipReason::SlotsExhausted);
        }
    }

    #[tokio::test]
    async fn occupied_teacher_produces_conflict_skip() {
        let store = InMemoryStore::new();

        // Teacher 1 already teaches another class in the only slot on Monday.
        let other_class = BookingRequest::new(
            slot(9, 10, 1.0).on(d(10)),
            [
                ResourceKey::Class(9),
                ResourceKey::Teacher(1),
                ResourceKey::Venue(99),
            ],
        );
        let blocker = store.commit(other_class).await;

        let generator = ScheduleGenerator::new(&store);
        let mut rng = StdRng::seed_from_u64(5);
        let request = GenerationRequest::new(
            7,
            vec![101],
            vec![1],
            vec![11],
            DateRange::new(d(10), d(11)).unwrap(),
            vec![slot(9, 10, 1.0)],
        );
        let result = generator.generate(&request, &mut rng).await.unwrap();
        assert!(result.created.is_empty());
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(
            result.skipped[0].reason,
            SkipReason::Conflict {
                resource: ResourceKey::Teacher(1),
                booking_id: blocker.id,
            }
        );
    }

    #[tokio::test]
    async fn no_created_bookings_overlap_on_shared_resources() {
        let store = InMemoryStore::new();
        let generator = ScheduleGenerator::new(&store);
        let mut rng = StdRng::seed_from_u64(99);

        let request = GenerationRequest::new(
            7,
            vec![101, 102, 103],
            vec![1, 2],
            vec![11],
            school_week(),
            vec![slot(9, 10, 1.0), slot(10, 11, 1.0), slot(11, 12, 4.0)],
        );
        let result = generator.generate(&request, &mut rng).await.unwrap();

        for (i, a) in result.created.iter().enumerate() {
            for b in &result.created[i + 1..] {
                let shared = a.resources.intersection(&b.resources).next().is_some();
                assert!(
                    !(shared && a.time.overlaps(&b.time)),
                    "{} and {} double-book",
                    a.id,
                    b.id
                );
            }
        }
    }

    #[tokio::test]
    async fn seeded_runs_are_reproducible() {
        let mut outcomes = Vec::new();
        for _ in 0..2 {
            let store = InMemoryStore::new();
            let generator = ScheduleGenerator::new(&store);
            let mut rng = StdRng::seed_from_u64(42);
            let result = generator.generate(&base_request(), &mut rng).await.unwrap();
            let picks: Vec<_> = result
                .created
                .iter()
                .map(|b| (b.time, b.resources.clone()))
                .collect();
            outcomes.push((picks, result.skipped.clone()));
        }
        assert_eq!(outcomes[0], outcomes[1]);
    }

    #[test]
    fn weighted_pick_respects_weights() {
        // A heavily weighted slot should dominate the draw.
        let slots = vec![slot(9, 10, 0.001), slot(10, 11, 1000.0)];
        let available = vec![0, 1];
        let mut rng = StdRng::seed_from_u64(11);
        let mut heavy = 0;
        for _ in 0..200 {
            if pick_weighted(&available, &slots, &mut rng) == Some(1) {
                heavy += 1;
            }
        }
        assert!(heavy > 190, "heavy slot picked only {heavy}/200 times");
    }

    #[test]
    fn weighted_pick_exhausted_returns_none() {
        let slots = vec![slot(9, 10, 1.0)];
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pick_weighted(&[], &slots, &mut rng), None);
    }
}
