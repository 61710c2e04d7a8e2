//! Prompt rendering for the generation backend.

use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::transcript::ArticleRequest;
use crate::io::image::ImageDimensions;

const WRITER_SYSTEM: &str = include_str!("prompts/writer_system.md");
const WRITER_TEMPLATE: &str = include_str!("prompts/writer.md");
const ILLUSTRATOR_SYSTEM: &str = include_str!("prompts/illustrator_system.md");
const ILLUSTRATOR_TEMPLATE: &str = include_str!("prompts/illustrator.md");

/// A rendered prompt: role instructions plus the task itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// What the illustration role knows about the article.
#[derive(Debug, Clone, Serialize)]
pub struct ImageSubject {
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
    min_words: u32,
    max_words: u32,
}

impl PromptEngine {
    pub fn new(min_words: u32, max_words: u32) -> Self {
        let mut env = Environment::new();
        env.add_template("writer", WRITER_TEMPLATE)
            .expect("writer template should be valid");
        env.add_template("illustrator", ILLUSTRATOR_TEMPLATE)
            .expect("illustrator template should be valid");
        Self {
            env,
            min_words,
            max_words,
        }
    }

    pub fn writer(&self, request: &ArticleRequest) -> Result<Prompt, minijinja::Error> {
        let (topic, content) = match request {
            ArticleRequest::Topic(topic) => (Some(topic.trim()), None),
            ArticleRequest::Content(content) => (None, Some(content.trim())),
        };
        let user = self.env.get_template("writer")?.render(context! {
            topic => topic,
            content => content,
            min_words => self.min_words,
            max_words => self.max_words,
        })?;
        Ok(Prompt {
            system: WRITER_SYSTEM.trim().to_string(),
            user: user.trim().to_string(),
        })
    }

    pub fn illustrator(
        &self,
        subject: &ImageSubject,
        dimensions: ImageDimensions,
    ) -> Result<Prompt, minijinja::Error> {
        let user = self.env.get_template("illustrator")?.render(context! {
            title => subject.title.trim(),
            summary => (!subject.summary.trim().is_empty()).then(|| subject.summary.trim()),
            tags => &subject.tags,
            width => dimensions.width,
            height => dimensions.height,
        })?;
        Ok(Prompt {
            system: ILLUSTRATOR_SYSTEM.trim().to_string(),
            user: user.trim().to_string(),
        })
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new(800, 1500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_prompt_for_topic() {
        let engine = PromptEngine::default();
        let prompt = engine
            .writer(&ArticleRequest::Topic("  Async Rust  ".to_string()))
            .expect("render");
        assert!(prompt.user.contains("Topic: Async Rust"));
        assert!(prompt.user.contains("800-1500 words"));
        assert!(!prompt.user.contains("Material:"));
        assert!(prompt.system.contains("TITLE:"));
        assert!(prompt.system.contains("BODY:"));
    }

    #[test]
    fn writer_prompt_for_content() {
        let engine = PromptEngine::new(300, 600);
        let prompt = engine
            .writer(&ArticleRequest::Content("my notes on lifetimes".to_string()))
            .expect("render");
        assert!(prompt.user.contains("Material:"));
        assert!(prompt.user.contains("my notes on lifetimes"));
        assert!(prompt.user.contains("300-600 words"));
        assert!(!prompt.user.contains("Topic:"));
    }

    #[test]
    fn illustrator_prompt_includes_subject() {
        let engine = PromptEngine::default();
        let subject = ImageSubject {
            title: "Tokio Deep Dive".to_string(),
            summary: String::new(),
            tags: vec!["rust".to_string(), "async".to_string()],
        };
        let prompt = engine
            .illustrator(
                &subject,
                ImageDimensions {
                    width: 1024,
                    height: 1024,
                },
            )
            .expect("render");
        assert!(prompt.user.contains("Title: Tokio Deep Dive"));
        assert!(prompt.user.contains("Tags: rust, async"));
        assert!(prompt.user.contains("1024x1024"));
        assert!(!prompt.user.contains("Summary:"));
        assert!(prompt.system.contains("No text in the image"));
    }
}
