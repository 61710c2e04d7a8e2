//! Wiring of config, credentials and capability adapters into a coordinator.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::agents::WRITER;
use crate::agents::illustrator::{IllustratorAgent, IllustratorCapabilities};
use crate::agents::publisher::PublisherAgent;
use crate::agents::writer::WriterAgent;
use crate::coordinator::Coordinator;
use crate::io::config::{Credentials, SwarmConfig};
use crate::io::content::{ChatCompletionsGenerator, ContentGenerator};
use crate::io::http;
use crate::io::image::{ImageGenerator, ImagesApiGenerator};
use crate::io::image_cache::ImageCache;
use crate::io::prompt::PromptEngine;
use crate::io::publish::{DevToPublisher, Publisher};
use crate::io::upload::{ImageUploader, ImgBbUploader};

/// The four capabilities the article roles call.
#[derive(Clone)]
pub struct Adapters {
    pub content: Arc<dyn ContentGenerator>,
    pub images: Arc<dyn ImageGenerator>,
    pub uploader: Arc<dyn ImageUploader>,
    pub publisher: Arc<dyn Publisher>,
}

/// Build the HTTP-backed adapters. Required credentials must be present.
pub fn http_adapters(config: &SwarmConfig, credentials: &Credentials) -> Result<Adapters> {
    let missing = credentials.missing_required();
    if !missing.is_empty() {
        bail!(
            "missing required credentials: {} (set them in the environment or a .env file)",
            missing.join(", ")
        );
    }
    let openai_key = credentials.openai_api_key.clone().unwrap_or_default();
    let devto_key = credentials.devto_api_key.clone().unwrap_or_default();

    let content = ChatCompletionsGenerator::new(
        http::client(Duration::from_secs(config.content.request_timeout_secs)),
        &config.content.endpoint,
        &config.content.model,
        openai_key.clone(),
    )
    .with_temperature(config.content.temperature);
    let images = ImagesApiGenerator::new(
        http::client(Duration::from_secs(config.image.request_timeout_secs)),
        &config.image.endpoint,
        &config.image.model,
        openai_key,
    );
    let uploader = ImgBbUploader::new(
        http::client(Duration::from_secs(config.upload.request_timeout_secs)),
        &config.upload.endpoint,
        credentials.imgbb_api_key.clone(),
    );
    let publisher = DevToPublisher::new(
        http::client(Duration::from_secs(config.publish.request_timeout_secs)),
        &config.publish.endpoint,
        &config.publish.site_url,
        devto_key,
    );
    Ok(Adapters {
        content: Arc::new(content),
        images: Arc::new(images),
        uploader: Arc::new(uploader),
        publisher: Arc::new(publisher),
    })
}

/// Assemble writer → illustrator → publisher behind a coordinator.
pub fn build_coordinator(config: &SwarmConfig, adapters: Adapters) -> Result<Coordinator> {
    config.validate()?;
    let prompts = Arc::new(PromptEngine::new(
        config.content.min_words,
        config.content.max_words,
    ));

    let writer = WriterAgent::new(
        Arc::clone(&adapters.content),
        Arc::clone(&prompts),
        config.publish.default_tags.clone(),
    );
    let illustrator = IllustratorAgent::new(
        IllustratorCapabilities {
            content: adapters.content,
            images: adapters.images,
            uploader: adapters.uploader,
        },
        prompts,
        ImageCache::new(&config.image.cache_dir),
        config.image_dimensions(),
    );
    let publisher = PublisherAgent::new(adapters.publisher, config.publish.draft);

    Coordinator::new(
        vec![Arc::new(writer), Arc::new(illustrator), Arc::new(publisher)],
        WRITER,
        config.run_limits(),
    )
    .context("build coordinator")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{ILLUSTRATOR, PUBLISHER};

    fn credentials(devto: Option<&str>) -> Credentials {
        Credentials {
            openai_api_key: Some("sk-test".to_string()),
            devto_api_key: devto.map(str::to_string),
            imgbb_api_key: None,
        }
    }

    #[test]
    fn http_adapters_require_publish_key() {
        let err = http_adapters(&SwarmConfig::default(), &credentials(None))
            .err()
            .expect("missing key");
        assert!(err.to_string().contains("DEV_TO_API_KEY"));
    }

    #[test]
    fn default_config_builds_three_stage_pipeline() {
        let config = SwarmConfig::default();
        let adapters = http_adapters(&config, &credentials(Some("devto"))).expect("adapters");
        let coordinator = build_coordinator(&config, adapters).expect("coordinator");

        assert_eq!(coordinator.entry(), WRITER);
        assert_eq!(
            coordinator.worker_names(),
            vec![WRITER, ILLUSTRATOR, PUBLISHER]
        );
        assert_eq!(coordinator.limits().max_handoffs, 10);
        assert_eq!(coordinator.limits().max_iterations, 15);
    }
}
