//! Stable exit codes for the `minions` CLI.

/// Command succeeded; for `run`, the root goal finished.
pub const OK: i32 = 0;
/// Invalid invocation, config, or workspace, or an unexpected runtime error.
pub const INVALID: i32 = 1;
/// The root goal ended in a failure status.
pub const FAILED: i32 = 2;
/// The run was cancelled (by the user or the run deadline).
pub const CANCELLED: i32 = 3;
