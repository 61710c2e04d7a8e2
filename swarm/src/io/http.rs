//! Shared plumbing for the HTTP capability adapters.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, Response};
use tracing::warn;

/// Failure reported by a capability adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// The credential the adapter needs is not configured.
    MissingCredential(&'static str),
    /// The request did not complete in time.
    Timeout,
    /// The remote API answered with a non-success status.
    Status { status: u16, body: String },
    /// Connection, TLS or body transfer failure.
    Transport(String),
    /// The response could not be interpreted.
    InvalidResponse(String),
}

impl AdapterError {
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, Self::MissingCredential(_))
    }
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential(var) => write!(f, "no credential ({var} is not set)"),
            Self::Timeout => f.write_str("request timed out"),
            Self::Status { status, body } => write!(f, "api returned {status}: {body}"),
            Self::Transport(msg) => write!(f, "request failed: {msg}"),
            Self::InvalidResponse(msg) => write!(f, "invalid response: {msg}"),
        }
    }
}

impl std::error::Error for AdapterError {}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Longest response body kept in error messages.
const ERROR_BODY_LIMIT: usize = 2_000;

/// Build a client with a per-request timeout.
pub fn client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("article-swarm/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|err| {
            warn!(err = %err, "falling back to default http client");
            Client::new()
        })
}

/// Pass through responses whose status equals one of `accepted`, otherwise
/// turn the response into [`AdapterError::Status`].
pub async fn expect_status(response: Response, accepted: &[u16]) -> Result<Response, AdapterError> {
    let status = response.status().as_u16();
    if accepted.contains(&status) {
        return Ok(response);
    }
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(AdapterError::Status { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_mentions_variable() {
        let err = AdapterError::MissingCredential("IMGBB_API_KEY");
        assert!(err.is_missing_credential());
        assert_eq!(err.to_string(), "no credential (IMGBB_API_KEY is not set)");
    }

    #[test]
    fn status_error_includes_body() {
        let err = AdapterError::Status {
            status: 422,
            body: "title can't be blank".to_string(),
        };
        assert_eq!(err.to_string(), "api returned 422: title can't be blank");
        assert!(!err.is_missing_credential());
    }
}
