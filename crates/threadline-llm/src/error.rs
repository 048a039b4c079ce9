use serde::Deserialize;
use thiserror::Error;

/// Failure returned by a provider adapter.
///
/// Classification comes from the HTTP status (and, for Gemini, the structured
/// error reason), never from the wording of the upstream message.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider rejected the API key ({status}): {body}")]
    Auth { status: u16, body: String },

    #[error("provider rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("provider rejected the request ({status}): {body}")]
    InvalidRequest { status: u16, body: String },

    #[error("provider error ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    #[error("provider returned no {0}")]
    EmptyResponse(&'static str),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ProviderError {
    /// Map a non-success HTTP status to a typed error
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Auth { status, body },
            429 => Self::RateLimited(body),
            400 | 404 | 413 | 422 => Self::InvalidRequest { status, body },
            _ => Self::Upstream { status, body },
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}

/// Error object some providers embed in an otherwise successful SSE stream
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InlineError {
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub message: String,
}

impl From<InlineError> for ProviderError {
    fn from(err: InlineError) -> Self {
        let status = err
            .code
            .as_ref()
            .and_then(|c| c.as_u64().or_else(|| c.as_str().and_then(|s| s.parse().ok())))
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(502);
        Self::from_status(status, err.message)
    }
}

/// Return the response untouched on 2xx, otherwise read the body into a typed error
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), "Provider returned error status");
    Err(ProviderError::from_status(status.as_u16(), body))
}

pub type Result<T> = std::result::Result<T, ProviderError>;
