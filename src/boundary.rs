//! Bounded-range validation: a term must nest inside its academic year, and
//! terms under the same year must not overlap each other. The same pair of
//! checks applies one level up (academic years under a school's calendar).

use ulid::Ulid;

use crate::error::EngineError;
use crate::model::{BoundedRange, DateRange};

/// Fails with `OutOfBounds` unless `parent` fully contains `child`.
/// Boundary equality is containment, not violation.
pub fn validate_nesting(child: &DateRange, parent: &DateRange) -> Result<(), EngineError> {
    if parent.contains(child) {
        Ok(())
    } else {
        Err(EngineError::OutOfBounds {
            child: *child,
            parent: *parent,
        })
    }
}

/// Fails with `OverlapDetected` if any sibling (other than `exclude`, the
/// range's own id during updates) overlaps the proposed child.
pub fn validate_no_sibling_overlap(
    child: &DateRange,
    siblings: &[BoundedRange],
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    for sibling in siblings {
        if exclude == Some(sibling.id) {
            continue;
        }
        if child.overlaps(&sibling.range) {
            return Err(EngineError::OverlapDetected {
                sibling: sibling.id,
                range: sibling.range,
            });
        }
    }
    Ok(())
}
