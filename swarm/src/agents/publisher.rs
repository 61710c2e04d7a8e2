//! Publishing role: posts the latest draft and ends the run.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::core::transcript::{self, Message, Payload};
use crate::io::publish::{Article, Publisher};

use super::{PUBLISHER, Worker, WorkerError, WorkerOutput};

pub struct PublisherAgent {
    publisher: Arc<dyn Publisher>,
    draft: bool,
}

impl PublisherAgent {
    pub fn new(publisher: Arc<dyn Publisher>, draft: bool) -> Self {
        Self { publisher, draft }
    }
}

/// Prepend the cover image to the article body when one is hosted.
pub fn compose_body(body: &str, cover: Option<&str>) -> String {
    match cover {
        Some(url) => format!("![Cover Image]({url})\n\n{body}"),
        None => body.to_string(),
    }
}

#[async_trait]
impl Worker for PublisherAgent {
    fn name(&self) -> &str {
        PUBLISHER
    }

    #[instrument(skip_all, fields(worker = PUBLISHER, draft = self.draft))]
    async fn invoke(
        &self,
        view: &[Message],
        _budget: Duration,
    ) -> Result<WorkerOutput, WorkerError> {
        let draft = transcript::latest_draft(view).ok_or_else(|| {
            WorkerError::MalformedInput("no draft in transcript to publish".to_string())
        })?;
        let cover = transcript::latest_image(view).and_then(|image| image.public_url());

        let article = Article {
            title: draft.title.clone(),
            tags: draft.tags.clone(),
            summary: draft.summary.clone(),
            body_markdown: compose_body(&draft.body, cover),
            cover_image_url: cover.map(str::to_string),
            draft: self.draft,
        };
        let confirmation = self
            .publisher
            .publish(&article)
            .await
            .map_err(|err| WorkerError::adapter("publish", err))?;
        info!(url = ?confirmation.url, "article published");
        Ok(WorkerOutput::done(vec![Payload::Published(confirmation)]))
    }
}
