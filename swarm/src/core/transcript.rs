//! Append-only transcript shared by every worker in a run.
//!
//! The transcript is the only channel through which workers pass data to each
//! other. Payloads are typed variants, so a worker locates its input with a
//! linear scan for the variant it needs rather than by matching free text.
//! Transcripts are short (a handful of messages), so no index is kept.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "name")]
pub enum Producer {
    User,
    Worker(String),
}

impl Producer {
    pub fn worker(name: impl Into<String>) -> Self {
        Self::Worker(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Worker(name) => name,
        }
    }
}

impl fmt::Display for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller asked the swarm to write about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "text")]
pub enum ArticleRequest {
    /// A free-text topic; the writer generates the article from scratch.
    Topic(String),
    /// Prepared content (inline or read from a file) to turn into an article.
    Content(String),
}

impl ArticleRequest {
    pub fn text(&self) -> &str {
        match self {
            Self::Topic(text) | Self::Content(text) => text,
        }
    }
}

/// Structured article fields produced by the drafting role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPayload {
    pub title: String,
    pub tags: Vec<String>,
    pub summary: String,
    pub body: String,
}

/// Outcome of the illustration role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ImageReference {
    /// Uploaded and publicly reachable.
    Hosted { url: String },
    /// Generated but only cached locally (no URL available).
    Local { path: PathBuf },
    /// No image could be produced or stored.
    Unavailable { reason: String },
}

impl ImageReference {
    /// Public URL, if the image was uploaded.
    pub fn public_url(&self) -> Option<&str> {
        match self {
            Self::Hosted { url } => Some(url),
            Self::Local { .. } | Self::Unavailable { .. } => None,
        }
    }
}

/// Confirmation returned by the publishing API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishConfirmation {
    pub id: Option<u64>,
    pub url: Option<String>,
    pub edit_url: Option<String>,
    pub title: String,
    pub draft: bool,
}

/// Typed message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "data")]
pub enum Payload {
    Request(ArticleRequest),
    Draft(DraftPayload),
    Image(ImageReference),
    Published(PublishConfirmation),
    Note { text: String },
}

impl Payload {
    pub fn note(text: impl Into<String>) -> Self {
        Self::Note { text: text.into() }
    }

    /// Short label used in logs and progress output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Draft(_) => "draft",
            Self::Image(_) => "image",
            Self::Published(_) => "published",
            Self::Note { .. } => "note",
        }
    }
}

/// One immutable transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// 1-based, gapless, assigned at append time.
    pub seq: u64,
    pub producer: Producer,
    pub payload: Payload,
    pub timestamp: DateTime<Utc>,
}

/// Ordered, append-only log of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a payload with the next sequence number and return that number.
    pub fn append(&mut self, producer: Producer, payload: Payload) -> u64 {
        let seq = self.messages.len() as u64 + 1;
        self.messages.push(Message {
            seq,
            producer,
            payload,
            timestamp: Utc::now(),
        });
        seq
    }

    /// The complete history, oldest first.
    pub fn view(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// The original user request (the first `Request` payload).
pub fn request(view: &[Message]) -> Option<&ArticleRequest> {
    view.iter().find_map(|message| match &message.payload {
        Payload::Request(request) => Some(request),
        _ => None,
    })
}

/// Most recent draft emitted by any worker.
pub fn latest_draft(view: &[Message]) -> Option<&DraftPayload> {
    view.iter().rev().find_map(|message| match &message.payload {
        Payload::Draft(draft) => Some(draft),
        _ => None,
    })
}

/// Most recent image reference emitted by any worker.
pub fn latest_image(view: &[Message]) -> Option<&ImageReference> {
    view.iter().rev().find_map(|message| match &message.payload {
        Payload::Image(image) => Some(image),
        _ => None,
    })
}

/// Most recent publish confirmation.
pub fn latest_publication(view: &[Message]) -> Option<&PublishConfirmation> {
    view.iter().rev().find_map(|message| match &message.payload {
        Payload::Published(confirmation) => Some(confirmation),
        _ => None,
    })
}
