use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ProviderError, Result};
use crate::traits::{GeneratedImage, ImageClient, ImageRequest};
use crate::types::Provider;

/// Gemini image generation through `generateContent`
pub struct GeminiClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl AsRef<str>) -> Result<Self> {
        Self::with_base_url(api_key, Provider::Gemini.default_base_url())
    }

    pub fn with_base_url(api_key: impl AsRef<str>, base_url: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut key = HeaderValue::from_str(api_key.as_ref())
            .map_err(|_| ProviderError::Config("invalid API key format".to_string()))?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn build_payload(request: &ImageRequest) -> Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"],
            },
        })
    }
}

#[async_trait]
impl ImageClient for GeminiClient {
    async fn generate_image(&self, request: ImageRequest) -> Result<GeneratedImage> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);

        tracing::debug!(provider = "gemini", model = %request.model, "Requesting image generation");

        let response = self
            .http_client
            .post(url)
            .json(&Self::build_payload(&request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Gemini returned error status");
            return Err(classify_error(status.as_u16(), body));
        }

        let raw: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Decode(format!("failed to parse Gemini response: {}", e)))?;

        raw.first_image()
    }
}

/// Gemini answers a bad key with 400 and reason `API_KEY_INVALID`
pub(crate) fn classify_error(status: u16, body: String) -> ProviderError {
    let invalid_key = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|env| {
            env.error
                .details
                .iter()
                .any(|d| d.reason.as_deref() == Some("API_KEY_INVALID"))
        })
        .unwrap_or(false);

    if invalid_key {
        ProviderError::Auth { status, body }
    } else {
        ProviderError::from_status(status, body)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

impl GenerateContentResponse {
    fn first_image(self) -> Result<GeneratedImage> {
        let inline = self
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.inline_data)
            .ok_or(ProviderError::EmptyResponse("image"))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| ProviderError::Decode(format!("invalid base64 image: {}", e)))?;

        Ok(GeneratedImage {
            bytes,
            mime_type: inline.mime_type,
        })
    }
}
