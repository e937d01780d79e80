use ulid::Ulid;

use crate::model::{DateRange, ResourceKey, SubjectId};

/// Every rejected operation carries a structured reason; the host maps these
/// to its own response shape (409/422 equivalents). Nothing is logged and
/// swallowed inside the engine.
#[derive(Debug)]
pub enum EngineError {
    /// A range whose start is not strictly before its end.
    InvalidRange(&'static str),
    /// A child range escapes its parent.
    OutOfBounds { child: DateRange, parent: DateRange },
    /// A sibling range under the same parent already covers part of the child.
    OverlapDetected { sibling: Ulid, range: DateRange },
    /// A booking already occupies one of the candidate's resources.
    Conflict {
        resource: ResourceKey,
        booking_id: Ulid,
    },
    /// A subject listed as its own prerequisite.
    SelfPrerequisite(SubjectId),
    /// Inserting the edge would close a dependency loop, or the existing
    /// graph already contains one.
    CycleDetected(SubjectId),
    /// A generation request that cannot be attempted at all.
    MalformedRequest(&'static str),
    /// Referenced booking does not exist in the store.
    NotFound(Ulid),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidRange(msg) => write!(f, "invalid range: {msg}"),
            EngineError::OutOfBounds { child, parent } => {
                write!(f, "range {child} falls outside parent {parent}")
            }
            EngineError::OverlapDetected { sibling, range } => {
                write!(f, "range overlaps sibling {sibling} covering {range}")
            }
            EngineError::Conflict {
                resource,
                booking_id,
            } => write!(f, "{resource} already occupied by booking {booking_id}"),
            EngineError::SelfPrerequisite(id) => {
                write!(f, "subject {id} cannot be its own prerequisite")
            }
            EngineError::CycleDetected(id) => {
                write!(f, "prerequisite cycle detected at subject {id}")
            }
            EngineError::MalformedRequest(msg) => write!(f, "malformed request: {msg}"),
            EngineError::NotFound(id) => write!(f, "booking not found: {id}"),
        }
    }
}

impl std::error::Error for EngineError {}
