//! Terminal statuses and the result of a run.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::transcript::{Transcript, latest_publication};

/// Final, non-revisable outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    MaxIterationsReached,
    MaxHandoffsReached,
    TimedOut,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::MaxIterationsReached => "max_iterations_reached",
            Self::MaxHandoffsReached => "max_handoffs_reached",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
        }
    }

    /// True for the statuses that reflect an exhausted budget on a healthy run.
    pub fn is_limit(self) -> bool {
        matches!(self, Self::MaxIterationsReached | Self::MaxHandoffsReached)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure classification.
///
/// Exhausted iteration/handoff ceilings are not failures; they surface as
/// [`RunStatus::MaxIterationsReached`] and [`RunStatus::MaxHandoffsReached`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A downstream capability (generation, image, upload, publish) failed.
    Adapter,
    /// Node-level or run-level timeout.
    Timeout,
    /// Missing credential, unknown handoff target, bad worker output.
    Configuration,
    /// A worker could not find the transcript fields it requires.
    MalformedInput,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Adapter => "adapter failure",
            Self::Timeout => "timeout",
            Self::Configuration => "configuration failure",
            Self::MalformedInput => "malformed input",
        };
        f.write_str(label)
    }
}

/// Why a run ended in `Failed` or `TimedOut`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    /// Worker that was active when the failure happened.
    pub worker: String,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}: {}", self.kind, self.worker, self.message)
    }
}

/// Everything the caller learns about a finished run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub status: RunStatus,
    /// Workers in execution order, with repeats.
    pub node_history: Vec<String>,
    pub iterations: u32,
    pub handoffs: u32,
    pub elapsed: Duration,
    /// Worker that was active when the run stopped.
    pub active_worker: String,
    pub failure: Option<Failure>,
    pub transcript: Transcript,
}

impl RunResult {
    /// URL of the published article, if the publisher got that far.
    pub fn article_url(&self) -> Option<&str> {
        latest_publication(self.transcript.view()).and_then(|c| c.url.as_deref())
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transcript::{Payload, Producer, PublishConfirmation};

    #[test]
    fn limit_statuses_are_flagged() {
        assert!(RunStatus::MaxIterationsReached.is_limit());
        assert!(RunStatus::MaxHandoffsReached.is_limit());
        assert!(!RunStatus::Completed.is_limit());
        assert!(!RunStatus::Failed.is_limit());
    }

    #[test]
    fn article_url_reads_publication() {
        let mut transcript = Transcript::new();
        transcript.append(
            Producer::worker("publisher_agent"),
            Payload::Published(PublishConfirmation {
                id: Some(7),
                url: Some("https://dev.to/me/post".to_string()),
                edit_url: None,
                title: "Post".to_string(),
                draft: true,
            }),
        );
        let result = RunResult {
            status: RunStatus::Completed,
            node_history: vec!["publisher_agent".to_string()],
            iterations: 1,
            handoffs: 0,
            elapsed: Duration::from_millis(1500),
            active_worker: "publisher_agent".to_string(),
            failure: None,
            transcript,
        };
        assert_eq!(result.article_url(), Some("https://dev.to/me/post"));
        assert_eq!(result.elapsed_ms(), 1500);
    }

    #[test]
    fn failure_display_names_worker() {
        let failure = Failure {
            kind: FailureKind::Adapter,
            worker: "writer_agent".to_string(),
            message: "quota exceeded".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "adapter failure in writer_agent: quota exceeded"
        );
    }
}
