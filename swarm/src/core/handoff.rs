//! Explicit transfer of control between workers.

use serde::{Deserialize, Serialize};

/// Request from the active worker to pass control to `target`.
///
/// The coordinator validates `target` against its configured worker set; an
/// unknown name fails the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffRequest {
    pub target: String,
    pub rationale: String,
}

impl HandoffRequest {
    pub fn new(target: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            rationale: rationale.into(),
        }
    }
}
