//! Write-ahead-log constants.

/// How long a WAL entry stays retryable. Past this age a rollback that still
/// cannot delete its target gives up and drops the entry rather than retrying
/// forever (e.g. the API credentials used to create it have been rotated).
pub const MAX_WAL_AGE_SECS: i64 = 24 * 60 * 60;
