//! Worker contract and the article pipeline roles.
//!
//! A worker reads the transcript, contributes one or more payloads, and may
//! request a handoff. Workers never write the transcript themselves and never
//! validate handoff targets; the coordinator does both.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::handoff::HandoffRequest;
use crate::core::status::FailureKind;
use crate::core::transcript::{Message, Payload};
use crate::io::http::AdapterError;

pub mod illustrator;
pub mod publisher;
pub mod writer;

/// Drafting role.
pub const WRITER: &str = "writer_agent";
/// Illustration role.
pub const ILLUSTRATOR: &str = "image_agent";
/// Publishing role.
pub const PUBLISHER: &str = "publisher_agent";

/// What a successful invocation contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutput {
    /// Payloads to append, in emission order.
    pub messages: Vec<Payload>,
    /// `None` means the worker is done and the run completes.
    pub handoff: Option<HandoffRequest>,
}

impl WorkerOutput {
    pub fn done(messages: Vec<Payload>) -> Self {
        Self {
            messages,
            handoff: None,
        }
    }

    pub fn handoff(messages: Vec<Payload>, handoff: HandoffRequest) -> Self {
        Self {
            messages,
            handoff: Some(handoff),
        }
    }
}

/// Failure signalled by a worker invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// A downstream capability call did not succeed.
    Adapter {
        capability: &'static str,
        source: AdapterError,
    },
    /// Transcript fields the worker depends on are absent.
    MalformedInput(String),
    /// The worker is misconfigured (e.g., a prompt template failed to render).
    Configuration(String),
}

impl WorkerError {
    pub fn adapter(capability: &'static str, source: AdapterError) -> Self {
        Self::Adapter { capability, source }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Adapter { source, .. } => match source {
                AdapterError::MissingCredential(_) => FailureKind::Configuration,
                AdapterError::Timeout => FailureKind::Timeout,
                _ => FailureKind::Adapter,
            },
            Self::MalformedInput(_) => FailureKind::MalformedInput,
            Self::Configuration(_) => FailureKind::Configuration,
        }
    }
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adapter { capability, source } => write!(f, "{capability}: {source}"),
            Self::MalformedInput(msg) => write!(f, "malformed input: {msg}"),
            Self::Configuration(msg) => write!(f, "configuration: {msg}"),
        }
    }
}

impl std::error::Error for WorkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Adapter { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<minijinja::Error> for WorkerError {
    fn from(err: minijinja::Error) -> Self {
        Self::Configuration(format!("render prompt: {err}"))
    }
}

/// A named pipeline stage.
#[async_trait]
pub trait Worker: Send + Sync {
    fn name(&self) -> &str;

    /// Contribute to the run given the full transcript so far.
    ///
    /// `budget` is the time this invocation may take; the coordinator cancels
    /// the invocation when it runs out.
    async fn invoke(
        &self,
        transcript: &[Message],
        budget: Duration,
    ) -> Result<WorkerOutput, WorkerError>;
}
