//! Stable exit codes for the `article-swarm` CLI.

use crate::core::status::RunStatus;

/// The run completed.
pub const OK: i32 = 0;
/// Invalid input, config or credentials; nothing was run.
pub const INVALID: i32 = 1;
/// A worker failed.
pub const FAILED: i32 = 2;
/// The iteration or handoff ceiling was reached.
pub const LIMIT: i32 = 3;
/// The execution timeout was reached.
pub const TIMEOUT: i32 = 4;

pub fn for_status(status: RunStatus) -> i32 {
    match status {
        RunStatus::Completed => OK,
        RunStatus::MaxIterationsReached | RunStatus::MaxHandoffsReached => LIMIT,
        RunStatus::TimedOut => TIMEOUT,
        RunStatus::Failed => FAILED,
    }
}
