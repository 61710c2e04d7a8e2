//! Resolution of the run input: a topic, a file, or inline content.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::core::transcript::ArticleRequest;

/// Turn exactly one of the three input sources into an [`ArticleRequest`].
pub fn resolve_request(
    topic: Option<&str>,
    file: Option<&Path>,
    content: Option<&str>,
) -> Result<ArticleRequest> {
    let request = match (topic, file, content) {
        (Some(topic), None, None) => ArticleRequest::Topic(topic.trim().to_string()),
        (None, Some(path), None) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read input file {}", path.display()))?;
            ArticleRequest::Content(text.trim().to_string())
        }
        (None, None, Some(content)) => ArticleRequest::Content(content.trim().to_string()),
        (None, None, None) => bail!("provide a topic, --file or --content"),
        _ => bail!("provide exactly one of a topic, --file or --content"),
    };
    if request.text().is_empty() {
        bail!("article input is empty");
    }
    Ok(request)
}
