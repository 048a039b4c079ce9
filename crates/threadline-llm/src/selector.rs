// Model id -> (provider, credential) resolution

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::Provider;

/// Keys a caller brings along with the request (BYOK)
#[derive(Clone, Default, Deserialize)]
pub struct UserKeys {
    #[serde(default)]
    pub openrouter: Option<String>,
    #[serde(default)]
    pub openai: Option<String>,
    #[serde(default)]
    pub gemini: Option<String>,
}

impl fmt::Debug for UserKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserKeys")
            .field("openrouter", &self.openrouter.is_some())
            .field("openai", &self.openai.is_some())
            .field("gemini", &self.gemini.is_some())
            .finish()
    }
}

/// Keys owned by the server, read from the environment at boot
#[derive(Clone, Default)]
pub struct ServerKeys {
    pub groq: Option<String>,
    pub openrouter: Option<String>,
}

impl fmt::Debug for ServerKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerKeys")
            .field("groq", &self.groq.is_some())
            .field("openrouter", &self.openrouter.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Models served by Groq on the server key
    pub groq_models: Vec<String>,
    pub openai_image_model: String,
    pub gemini_image_model: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            groq_models: [
                "llama-3.3-70b-versatile",
                "llama-3.1-8b-instant",
                "meta-llama/llama-4-scout-17b-16e-instruct",
                "deepseek-r1-distill-llama-70b",
                "qwen-qwq-32b",
                "gemma2-9b-it",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            openai_image_model: "gpt-image-1".to_string(),
            gemini_image_model: "gemini-2.0-flash-preview-image-generation".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Text,
    Image,
}

/// Where a turn goes and with which key
#[derive(Clone)]
pub struct Route {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub kind: RouteKind,
}

impl Route {
    pub fn is_image(&self) -> bool {
        self.kind == RouteKind::Image
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("kind", &self.kind)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Server-side configuration problem, not the caller's fault
    #[error("server key for {0} is not configured")]
    MissingServerKey(Provider),

    #[error("an API key for {0} is required for this model")]
    ApiKeyRequired(Provider),
}

/// Pure selection policy; first matching rule wins
#[derive(Debug, Clone)]
pub struct ProviderSelector {
    config: SelectorConfig,
    server_keys: ServerKeys,
}

impl ProviderSelector {
    pub fn new(config: SelectorConfig, server_keys: ServerKeys) -> Self {
        Self {
            config,
            server_keys,
        }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn select(&self, model: &str, user_keys: &UserKeys) -> Result<Route, SelectionError> {
        if self.config.groq_models.iter().any(|m| m == model) {
            let key = present(&self.server_keys.groq)
                .ok_or(SelectionError::MissingServerKey(Provider::Groq))?;
            return Ok(route(Provider::Groq, key, model, RouteKind::Text));
        }

        if model == self.config.openai_image_model {
            let key = present(&user_keys.openai)
                .ok_or(SelectionError::ApiKeyRequired(Provider::OpenAI))?;
            return Ok(route(Provider::OpenAI, key, model, RouteKind::Image));
        }

        if model == self.config.gemini_image_model {
            let key = present(&user_keys.gemini)
                .ok_or(SelectionError::ApiKeyRequired(Provider::Gemini))?;
            return Ok(route(Provider::Gemini, key, model, RouteKind::Image));
        }

        let key = present(&user_keys.openrouter)
            .or_else(|| present(&self.server_keys.openrouter))
            .ok_or(SelectionError::ApiKeyRequired(Provider::OpenRouter))?;
        Ok(route(Provider::OpenRouter, key, model, RouteKind::Text))
    }

    /// Route for the title summarizer, always Groq on the server key
    pub fn title_route(&self, model: &str) -> Result<Route, SelectionError> {
        let key = present(&self.server_keys.groq)
            .ok_or(SelectionError::MissingServerKey(Provider::Groq))?;
        Ok(route(Provider::Groq, key, model, RouteKind::Text))
    }
}

fn present(key: &Option<String>) -> Option<&str> {
    key.as_deref().map(str::trim).filter(|k| !k.is_empty())
}

fn route(provider: Provider, key: &str, model: &str, kind: RouteKind) -> Route {
    Route {
        provider,
        api_key: key.to_string(),
        model: model.to_string(),
        kind,
    }
}
