//! Stable exit codes for planner CLI commands.

/// Goal achieved, or the request is valid (`planner validate`).
pub const OK: i32 = 0;
/// Invalid request, config or world edit, or any other error.
pub const INVALID: i32 = 1;
/// Planning stopped at the iteration cap without achieving the goal.
pub const BUDGET_EXHAUSTED: i32 = 2;
/// Planning stopped at the deliberation timeout without achieving the goal.
pub const TIMED_OUT: i32 = 3;
