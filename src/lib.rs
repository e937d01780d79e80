//! rota — scheduling and constraint-validation engine for school
//! administration backends.
//!
//! One component for the temporal logic the host's CRUD controllers share:
//! interval-overlap conflict detection across resource dimensions (class,
//! teacher, venue), term/academic-year nesting validation, acyclic subject
//! prerequisite graphs, weighted bulk timetable generation, and single exam
//! scheduling. All interval math is half-open: ranges touching at an endpoint
//! never conflict.
//!
//! The host persistence layer plugs in behind [`store::BookingStore`]; the
//! engine's checks are advisory under concurrency, and the store must carry
//! the final uniqueness guarantee.

pub mod boundary;
pub mod conflict;
pub mod error;
pub mod exam;
pub mod generate;
pub mod limits;
pub mod model;
pub mod observability;
pub mod prereq;
pub mod store;

pub use error::EngineError;
pub use exam::{ExamRequest, ExamScheduler};
pub use generate::{GenerationRequest, GenerationResult, ScheduleGenerator, SkipReason, Skipped};
pub use model::{
    Booking, BookingRequest, BoundedRange, DateRange, ResourceId, ResourceKey, SubjectId,
    TimeRange, WeightedSlot,
};
pub use prereq::{PrerequisiteGraph, PrerequisiteLookup, resolve_chain, would_create_cycle};
pub use store::{BookingStore, InMemoryStore};
