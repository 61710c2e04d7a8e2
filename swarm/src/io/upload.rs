//! Image-hosting capability: bytes in, public URL out.
//!
//! Hosting is optional. Without a credential the uploader reports
//! [`AdapterError::MissingCredential`] and the illustration role falls back to
//! the locally cached file.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::io::http::{AdapterError, expect_status};

/// Environment variable holding the ImgBB key.
pub const IMGBB_API_KEY: &str = "IMGBB_API_KEY";

/// Abstraction over image hosting services.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, image: &[u8]) -> Result<String, AdapterError>;
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    data: Option<UploadData>,
    error: Option<UploadErrorBody>,
}

#[derive(Deserialize)]
struct UploadData {
    url: String,
}

#[derive(Deserialize)]
struct UploadErrorBody {
    message: Option<String>,
}

/// ImgBB uploader (`POST /1/upload` with a base64 `image` form field).
pub struct ImgBbUploader {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ImgBbUploader {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }
}

#[async_trait]
impl ImageUploader for ImgBbUploader {
    #[instrument(skip_all, fields(bytes = image.len()))]
    async fn upload(&self, image: &[u8]) -> Result<String, AdapterError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AdapterError::MissingCredential(IMGBB_API_KEY))?;
        let encoded = STANDARD.encode(image);
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("key", api_key), ("image", encoded.as_str())])
            .send()
            .await?;
        let response = expect_status(response, &[200]).await?;
        let parsed: UploadResponse = response.json().await?;
        match parsed {
            UploadResponse {
                success: true,
                data: Some(data),
                ..
            } => {
                debug!(url = %data.url, "image uploaded");
                Ok(data.url)
            }
            UploadResponse { error, .. } => Err(AdapterError::InvalidResponse(format!(
                "upload failed: {}",
                error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "unknown error".to_string())
            ))),
        }
    }
}
