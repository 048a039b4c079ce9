// Bearer-auth client for every provider that speaks the OpenAI chat wire format

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ensure_success, ProviderError, Result};
use crate::streaming::parse_chat_sse_stream;
use crate::traits::{
    ChatClient, ChatOptions, ChatRequest, ChatResponse, EventStream, GeneratedImage, ImageClient,
    ImageRequest, TokenUsage,
};
use crate::types::{Message, Provider};

/// OpenAI-compatible client (HTTP direct, no SDK).
///
/// One type serves OpenAI, Groq and OpenRouter; only the base URL and a few
/// request fields differ between them.
pub struct OpenAICompatClient {
    http_client: reqwest::Client,
    base_url: String,
    provider: Provider,
}

impl OpenAICompatClient {
    pub fn new(
        api_key: impl AsRef<str>,
        base_url: impl Into<String>,
        provider: Provider,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key.as_ref()))
            .map_err(|_| ProviderError::Config("invalid API key format".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            provider,
        })
    }

    pub fn openai(api_key: impl AsRef<str>) -> Result<Self> {
        Self::new(api_key, Provider::OpenAI.default_base_url(), Provider::OpenAI)
    }

    pub fn groq(api_key: impl AsRef<str>) -> Result<Self> {
        Self::new(api_key, Provider::Groq.default_base_url(), Provider::Groq)
    }

    pub fn openrouter(api_key: impl AsRef<str>) -> Result<Self> {
        Self::new(api_key, Provider::OpenRouter.default_base_url(), Provider::OpenRouter)
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Build chat completion request payload
    pub(crate) fn build_chat_payload(
        &self,
        model: &str,
        messages: &[Message],
        options: &ChatOptions,
        stream: bool,
    ) -> Result<Value> {
        let messages = serde_json::to_value(messages)
            .map_err(|e| ProviderError::Decode(format!("failed to encode messages: {}", e)))?;

        let mut payload = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": stream,
        });

        let Some(obj) = payload.as_object_mut() else {
            return Err(ProviderError::Config("payload is not an object".to_string()));
        };

        if let Some(temp) = options.temperature {
            obj.insert("temperature".to_string(), serde_json::json!(temp));
        }
        if let Some(top_p) = options.top_p {
            obj.insert("top_p".to_string(), serde_json::json!(top_p));
        }
        if let Some(max_tokens) = options.max_tokens {
            obj.insert("max_tokens".to_string(), serde_json::json!(max_tokens));
        }

        match self.provider {
            Provider::OpenRouter => {
                // OpenRouter forwards top_k and takes reasoning as a nested object
                if let Some(top_k) = options.top_k {
                    obj.insert("top_k".to_string(), serde_json::json!(top_k));
                }
                if let Some(effort) = &options.reasoning_effort {
                    obj.insert(
                        "reasoning".to_string(),
                        serde_json::json!({ "effort": effort }),
                    );
                }
            }
            _ => {
                if let Some(effort) = &options.reasoning_effort {
                    obj.insert("reasoning_effort".to_string(), serde_json::json!(effort));
                }
            }
        }

        Ok(payload)
    }

    fn build_image_payload(&self, request: &ImageRequest) -> Value {
        let mut payload = serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "n": 1,
        });
        // gpt-image models always answer with base64 and reject response_format
        if request.model.starts_with("dall-e") {
            if let Some(obj) = payload.as_object_mut() {
                obj.insert("response_format".to_string(), serde_json::json!("b64_json"));
            }
        }
        payload
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .json(payload)
            .send()
            .await?;

        ensure_success(response).await
    }
}

#[async_trait]
impl ChatClient for OpenAICompatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload =
            self.build_chat_payload(&request.model, &request.messages, &request.options, false)?;

        tracing::debug!(provider = %self.provider, model = %request.model, "Sending chat request");

        let response = self.post("/chat/completions", &payload).await?;
        let raw: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("failed to parse response: {}", e)))?;

        let choice = raw.choices.into_iter().next();

        Ok(ChatResponse {
            content: choice.as_ref().and_then(|c| c.message.content.clone()),
            reasoning: choice.as_ref().and_then(|c| c.message.reasoning.clone()),
            usage: raw.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.and_then(|c| c.finish_reason),
        })
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        let payload =
            self.build_chat_payload(&request.model, &request.messages, &request.options, true)?;

        tracing::debug!(provider = %self.provider, model = %request.model, "Opening chat stream");

        let response = self.post("/chat/completions", &payload).await?;
        Ok(parse_chat_sse_stream(response.bytes_stream()))
    }
}

#[async_trait]
impl ImageClient for OpenAICompatClient {
    async fn generate_image(&self, request: ImageRequest) -> Result<GeneratedImage> {
        let payload = self.build_image_payload(&request);

        tracing::debug!(provider = %self.provider, model = %request.model, "Requesting image generation");

        let response = self.post("/images/generations", &payload).await?;
        let raw: ImagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("failed to parse image response: {}", e)))?;

        let encoded = raw
            .data
            .into_iter()
            .find_map(|d| d.b64_json)
            .ok_or(ProviderError::EmptyResponse("image"))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| ProviderError::Decode(format!("invalid base64 image: {}", e)))?;

        Ok(GeneratedImage {
            bytes,
            mime_type: "image/png".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(alias = "reasoning_content")]
    reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}
