//! Hard caps on request sizes. Checked up front so a malformed or abusive
//! request is rejected before any generation work starts.

/// Max subjects placed per class per day in one generation request.
pub const MAX_SUBJECTS_PER_REQUEST: usize = 64;

/// Max weighted slots in one request's catalog.
pub const MAX_SLOTS_PER_REQUEST: usize = 64;

/// Max teachers or venues in a selection pool.
pub const MAX_POOL_SIZE: usize = 1024;

/// Max calendar days one generation run may cover (a school year is ~365).
pub const MAX_GENERATION_DAYS: usize = 400;
