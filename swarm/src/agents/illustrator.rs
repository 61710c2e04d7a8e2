//! Illustration role: generates a cover image and records where it lives.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::core::handoff::HandoffRequest;
use crate::core::transcript::{self, ImageReference, Message, Payload};
use crate::io::content::ContentGenerator;
use crate::io::image::{ImageDimensions, ImageGenerator};
use crate::io::image_cache::ImageCache;
use crate::io::prompt::{ImageSubject, PromptEngine};
use crate::io::upload::ImageUploader;

use super::{ILLUSTRATOR, PUBLISHER, Worker, WorkerError, WorkerOutput};

/// Capabilities the illustration role calls.
pub struct IllustratorCapabilities {
    pub content: Arc<dyn ContentGenerator>,
    pub images: Arc<dyn ImageGenerator>,
    pub uploader: Arc<dyn ImageUploader>,
}

/// Creates a cover image for the latest draft and hands off to publishing.
pub struct IllustratorAgent {
    capabilities: IllustratorCapabilities,
    prompts: Arc<PromptEngine>,
    cache: ImageCache,
    dimensions: ImageDimensions,
}

impl IllustratorAgent {
    pub fn new(
        capabilities: IllustratorCapabilities,
        prompts: Arc<PromptEngine>,
        cache: ImageCache,
        dimensions: ImageDimensions,
    ) -> Self {
        Self {
            capabilities,
            prompts,
            cache,
            dimensions,
        }
    }

    async fn store_image(&self, bytes: &[u8]) -> ImageReference {
        let cached = match self.cache.store(bytes).await {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(err = %format!("{err:#}"), "could not cache image locally");
                None
            }
        };
        match self.capabilities.uploader.upload(bytes).await {
            Ok(url) => ImageReference::Hosted { url },
            Err(err) => {
                if err.is_missing_credential() {
                    info!(err = %err, "image hosting not configured, keeping local copy");
                } else {
                    warn!(err = %err, "image upload failed, keeping local copy");
                }
                match cached {
                    Some(path) => ImageReference::Local { path },
                    None => ImageReference::Unavailable {
                        reason: err.to_string(),
                    },
                }
            }
        }
    }
}

/// Describe what the cover should depict, from the draft or the raw request.
fn image_subject(view: &[Message]) -> Result<ImageSubject, WorkerError> {
    if let Some(draft) = transcript::latest_draft(view) {
        return Ok(ImageSubject {
            title: draft.title.clone(),
            summary: draft.summary.clone(),
            tags: draft.tags.clone(),
        });
    }
    warn!("no draft in transcript, illustrating the request instead");
    let request = transcript::request(view).ok_or_else(|| {
        WorkerError::MalformedInput("no draft or article request in transcript".to_string())
    })?;
    Ok(ImageSubject {
        title: request.text().lines().next().unwrap_or_default().to_string(),
        summary: String::new(),
        tags: Vec::new(),
    })
}

#[async_trait]
impl Worker for IllustratorAgent {
    fn name(&self) -> &str {
        ILLUSTRATOR
    }

    #[instrument(skip_all, fields(worker = ILLUSTRATOR))]
    async fn invoke(
        &self,
        view: &[Message],
        _budget: Duration,
    ) -> Result<WorkerOutput, WorkerError> {
        let subject = image_subject(view)?;
        let prompt = self.prompts.illustrator(&subject, self.dimensions)?;
        let generated = self
            .capabilities
            .content
            .generate(&prompt)
            .await
            .map_err(|err| WorkerError::adapter("content generation", err))?;
        let image_prompt = match generated.trim() {
            "" => format!(
                "Abstract technology cover art for an article titled \"{}\", no text",
                subject.title
            ),
            text => text.to_string(),
        };

        let bytes = self
            .capabilities
            .images
            .generate_image(&image_prompt, self.dimensions)
            .await
            .map_err(|err| WorkerError::adapter("image generation", err))?;
        let reference = self.store_image(&bytes).await;

        let rationale = match &reference {
            ImageReference::Hosted { url } => {
                format!("Cover image uploaded to {url}; insert it at the top and publish.")
            }
            ImageReference::Local { path } => format!(
                "No URL available; the cover image is only stored locally at {}. \
                 Publish without it.",
                path.display()
            ),
            ImageReference::Unavailable { reason } => {
                format!("No URL available ({reason}). Publish without a cover image.")
            }
        };
        info!(reference = ?reference, "cover image ready");
        Ok(WorkerOutput::handoff(
            vec![
                Payload::note(format!("Image prompt: {image_prompt}")),
                Payload::Image(reference),
            ],
            HandoffRequest::new(PUBLISHER, rationale),
        ))
    }
}
