//! Run limits and time budget helpers.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Immutable ceilings for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLimits {
    /// Maximum number of handoffs performed. Zero means the entry worker is the only worker.
    pub max_handoffs: u32,
    /// Maximum number of worker invocations. Must be at least 1.
    pub max_iterations: u32,
    /// Wall-clock budget for the whole run.
    pub execution_timeout: Duration,
    /// Budget for a single worker invocation.
    pub node_timeout: Duration,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_handoffs: 10,
            max_iterations: 15,
            execution_timeout: Duration::from_secs(600),
            node_timeout: Duration::from_secs(300),
        }
    }
}

/// A limit value that cannot drive a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLimits(pub &'static str);

impl fmt::Display for InvalidLimits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid run limits: {}", self.0)
    }
}

impl std::error::Error for InvalidLimits {}

impl RunLimits {
    pub fn validate(&self) -> Result<(), InvalidLimits> {
        if self.max_iterations == 0 {
            return Err(InvalidLimits("max_iterations must be >= 1"));
        }
        if self.execution_timeout.is_zero() {
            return Err(InvalidLimits("execution_timeout must be > 0"));
        }
        if self.node_timeout.is_zero() {
            return Err(InvalidLimits("node_timeout must be > 0"));
        }
        Ok(())
    }

    /// Budget for the next invocation: the node timeout, clamped to what is
    /// left of the execution timeout. The flag is true when the clamp applied.
    pub fn invocation_budget(&self, elapsed: Duration) -> (Duration, bool) {
        let left = self.execution_timeout.saturating_sub(elapsed);
        if left < self.node_timeout {
            (left, true)
        } else {
            (self.node_timeout, false)
        }
    }
}
