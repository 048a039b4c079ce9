use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ProviderError, Result};
use crate::gemini::GeminiClient;
use crate::openai::OpenAICompatClient;
use crate::selector::Route;
use crate::traits::{ChatClient, ImageClient};
use crate::types::Provider;

/// Builds a client for a selected route.
///
/// Clients are created per request because the key may belong to the caller.
pub trait ClientFactory: Send + Sync {
    fn chat_client(&self, route: &Route) -> Result<Arc<dyn ChatClient>>;

    fn image_client(&self, route: &Route) -> Result<Arc<dyn ImageClient>>;
}

/// Factory producing the real HTTP clients
#[derive(Debug, Clone, Default)]
pub struct HttpClientFactory {
    base_urls: HashMap<Provider, String>,
}

impl HttpClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point a provider at another endpoint (proxies, local mocks)
    pub fn with_base_url(mut self, provider: Provider, base_url: impl Into<String>) -> Self {
        self.base_urls.insert(provider, base_url.into());
        self
    }

    fn base_url(&self, provider: Provider) -> String {
        self.base_urls
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| provider.default_base_url().to_string())
    }
}

impl ClientFactory for HttpClientFactory {
    fn chat_client(&self, route: &Route) -> Result<Arc<dyn ChatClient>> {
        match route.provider {
            Provider::Groq | Provider::OpenAI | Provider::OpenRouter => {
                let client = OpenAICompatClient::new(
                    &route.api_key,
                    self.base_url(route.provider),
                    route.provider,
                )?;
                Ok(Arc::new(client))
            }
            Provider::Gemini => Err(ProviderError::Config(
                "Gemini is only wired for image generation".to_string(),
            )),
        }
    }

    fn image_client(&self, route: &Route) -> Result<Arc<dyn ImageClient>> {
        match route.provider {
            Provider::OpenAI => {
                let client = OpenAICompatClient::new(
                    &route.api_key,
                    self.base_url(Provider::OpenAI),
                    Provider::OpenAI,
                )?;
                Ok(Arc::new(client))
            }
            Provider::Gemini => {
                let client =
                    GeminiClient::with_base_url(&route.api_key, self.base_url(Provider::Gemini))?;
                Ok(Arc::new(client))
            }
            other => Err(ProviderError::Config(format!(
                "{} does not generate images",
                other
            ))),
        }
    }
}
