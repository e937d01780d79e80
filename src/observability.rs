//! Metric names recorded through the `metrics` facade. Installing an
//! exporter is the host's job; without one these are no-ops.

/// Counter: bookings committed through the engine. Labels: source.
pub const BOOKINGS_COMMITTED_TOTAL: &str = "rota_bookings_committed_total";

/// Counter: candidate bookings rejected by conflict detection. Labels: source, dimension.
pub const CONFLICTS_DETECTED_TOTAL: &str = "rota_conflicts_detected_total";

/// Counter: generation runs started.
pub const GENERATION_RUNS_TOTAL: &str = "rota_generation_runs_total";

/// Counter: per-item skips during generation. Labels: reason.
pub const GENERATION_SKIPPED_TOTAL: &str = "rota_generation_skipped_total";

/// Histogram: bookings created per generation run.
pub const GENERATION_CREATED_PER_RUN: &str = "rota_generation_created_per_run";
