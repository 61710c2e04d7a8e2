//! Image-generation capability: prompt and dimensions in, image bytes out.

use std::fmt;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::io::http::{AdapterError, expect_status};

/// Requested output size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for ImageDimensions {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

impl fmt::Display for ImageDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Abstraction over image generation backends.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(
        &self,
        prompt: &str,
        dimensions: ImageDimensions,
    ) -> Result<Vec<u8>, AdapterError>;
}

#[derive(Serialize)]
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: String,
    response_format: &'static str,
}

#[derive(Deserialize)]
struct ImagesResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    #[serde(default)]
    b64_json: Option<String>,
}

/// OpenAI-compatible images endpoint returning base64 payloads.
pub struct ImagesApiGenerator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl ImagesApiGenerator {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ImageGenerator for ImagesApiGenerator {
    #[instrument(skip_all, fields(model = %self.model, size = %dimensions))]
    async fn generate_image(
        &self,
        prompt: &str,
        dimensions: ImageDimensions,
    ) -> Result<Vec<u8>, AdapterError> {
        let request = ImagesRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: dimensions.to_string(),
            response_format: "b64_json",
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = expect_status(response, &[200]).await?;
        let parsed: ImagesResponse = response.json().await?;
        let encoded = parsed
            .data
            .into_iter()
            .find_map(|datum| datum.b64_json)
            .ok_or_else(|| AdapterError::InvalidResponse("no image data".to_string()))?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|err| AdapterError::InvalidResponse(format!("decode image: {err}")))?;
        debug!(bytes = bytes.len(), "generated image");
        Ok(bytes)
    }
}
