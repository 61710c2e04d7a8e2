//! Drafting role: turns the user request into a structured draft.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::core::draft::parse_fields;
use crate::core::handoff::HandoffRequest;
use crate::core::transcript::{self, ArticleRequest, Message, Payload};
use crate::io::content::ContentGenerator;
use crate::io::prompt::PromptEngine;

use super::{ILLUSTRATOR, Worker, WorkerError, WorkerOutput, WRITER};

/// Writes the article and hands off to the illustration role.
pub struct WriterAgent {
    content: Arc<dyn ContentGenerator>,
    prompts: Arc<PromptEngine>,
    default_tags: Vec<String>,
    handoff_to: String,
}

impl WriterAgent {
    pub fn new(
        content: Arc<dyn ContentGenerator>,
        prompts: Arc<PromptEngine>,
        default_tags: Vec<String>,
    ) -> Self {
        Self {
            content,
            prompts,
            default_tags,
            handoff_to: ILLUSTRATOR.to_string(),
        }
    }

    /// Override the worker that receives the draft.
    pub fn with_handoff_to(mut self, target: impl Into<String>) -> Self {
        self.handoff_to = target.into();
        self
    }

    fn finish(&self, draft: transcript::DraftPayload) -> WorkerOutput {
        let rationale = format!(
            "Draft \"{}\" is complete; please generate a cover image for it.",
            draft.title
        );
        WorkerOutput::handoff(
            vec![Payload::Draft(draft)],
            HandoffRequest::new(&self.handoff_to, rationale),
        )
    }
}

#[async_trait]
impl Worker for WriterAgent {
    fn name(&self) -> &str {
        WRITER
    }

    #[instrument(skip_all, fields(worker = WRITER))]
    async fn invoke(
        &self,
        view: &[Message],
        _budget: Duration,
    ) -> Result<WorkerOutput, WorkerError> {
        let request = transcript::request(view).ok_or_else(|| {
            WorkerError::MalformedInput("no article request in transcript".to_string())
        })?;

        // Content that is already a complete draft is used as-is.
        if let ArticleRequest::Content(text) = request {
            if let Ok(draft) = parse_fields(text).complete() {
                info!(title = %draft.title, "using prepared draft");
                return Ok(self.finish(draft));
            }
        }

        let prompt = self.prompts.writer(request)?;
        let generated = self
            .content
            .generate(&prompt)
            .await
            .map_err(|err| WorkerError::adapter("content generation", err))?;

        let fields = parse_fields(&generated);
        let draft = match fields.complete() {
            Ok(draft) => draft,
            Err(err) => {
                warn!(err = %err, "generated draft is incomplete, filling defaults");
                let topic = request.text().lines().next().unwrap_or_default();
                fields.or_defaults(&generated, topic, &self.default_tags)
            }
        };
        info!(title = %draft.title, tags = ?draft.tags, "draft written");
        Ok(self.finish(draft))
    }
}
