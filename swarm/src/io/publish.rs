//! Publishing capability: Dev.to (Forem) articles API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::core::transcript::PublishConfirmation;
use crate::io::http::{AdapterError, expect_status};

/// Environment variable holding the Dev.to key.
pub const DEV_TO_API_KEY: &str = "DEV_TO_API_KEY";

/// Final document handed to the publishing API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub tags: Vec<String>,
    pub summary: String,
    pub body_markdown: String,
    pub cover_image_url: Option<String>,
    /// Save as draft instead of publishing publicly.
    pub draft: bool,
}

/// Abstraction over article publishing backends.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, article: &Article) -> Result<PublishConfirmation, AdapterError>;
}

#[derive(Serialize)]
struct CreateArticle<'a> {
    article: ArticleBody<'a>,
}

#[derive(Serialize)]
struct ArticleBody<'a> {
    title: &'a str,
    body_markdown: &'a str,
    published: bool,
    tags: &'a [String],
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    main_image: Option<&'a str>,
}

#[derive(Deserialize)]
struct CreatedArticle {
    id: Option<u64>,
    url: Option<String>,
    path: Option<String>,
    title: Option<String>,
}

/// Dev.to client (`POST /api/articles`, `api-key` header, 201 on success).
pub struct DevToPublisher {
    client: Client,
    endpoint: String,
    site_url: String,
    api_key: String,
}

impl DevToPublisher {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        site_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            site_url: site_url.into(),
            api_key: api_key.into(),
        }
    }

    fn edit_url(&self, path: &str) -> String {
        format!(
            "{}/{}/edit",
            self.site_url.trim_end_matches('/'),
            path.trim_matches('/')
        )
    }
}

#[async_trait]
impl Publisher for DevToPublisher {
    #[instrument(skip_all, fields(title = %article.title, draft = article.draft))]
    async fn publish(&self, article: &Article) -> Result<PublishConfirmation, AdapterError> {
        if self.api_key.trim().is_empty() {
            return Err(AdapterError::MissingCredential(DEV_TO_API_KEY));
        }
        let request = CreateArticle {
            article: ArticleBody {
                title: &article.title,
                body_markdown: &article.body_markdown,
                published: !article.draft,
                tags: &article.tags,
                description: &article.summary,
                main_image: article.cover_image_url.as_deref(),
            },
        };
        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = expect_status(response, &[201]).await?;
        let created: CreatedArticle = response.json().await?;
        let confirmation = PublishConfirmation {
            id: created.id,
            url: created.url,
            edit_url: created.path.as_deref().map(|path| self.edit_url(path)),
            title: created.title.unwrap_or_else(|| article.title.clone()),
            draft: article.draft,
        };
        info!(url = ?confirmation.url, "article created");
        Ok(confirmation)
    }
}
