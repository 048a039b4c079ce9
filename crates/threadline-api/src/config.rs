use config::{Config as ConfigLoader, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use threadline_llm::{HttpClientFactory, Provider, SelectorConfig, ServerKeys};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub upload: UploadConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub mongodb_uri: String,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default)]
    pub openrouter_api_key: Option<String>,
    #[serde(default)]
    pub clerk_jwt_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Mongodb,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub groq_models: Vec<String>,
    pub openai_image_model: String,
    pub gemini_image_model: String,
    /// Groq model used by the title summarizer
    pub title_model: String,
    /// Per-provider endpoint overrides (proxies, local mocks)
    #[serde(default)]
    pub base_urls: ProviderUrls,
    /// Assistant placeholders untouched for this long are marked as errors
    #[serde(default = "default_stale_secs")]
    pub stale_placeholder_secs: u64,
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
}

impl LlmConfig {
    /// How often a live stream refreshes its placeholder, kept well under
    /// the stale threshold so the reconciler never closes a running turn
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs((self.stale_placeholder_secs / 4).clamp(1, 60))
    }
}

fn default_stale_secs() -> u64 {
    900
}

fn default_reconcile_interval() -> u64 {
    300
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderUrls {
    pub groq: Option<String>,
    pub openai: Option<String>,
    pub gemini: Option<String>,
    pub openrouter: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_files: usize,
    pub max_file_size_bytes: usize,
    pub allowed_types: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible services
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Public URL prefix for stored objects (CDN, custom domain)
    #[serde(default)]
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub enabled: bool,
    /// Allowed `azp` claims; empty accepts any
    #[serde(default)]
    pub authorized_parties: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. THREADLINE_* environment variables, `__` between path segments
    ///    (e.g. THREADLINE_SERVER__PORT, THREADLINE_LLM__GROQ_MODELS="a,b")
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            // 1. Load default config
            .add_source(File::with_name("config/default").required(false))
            // 2. Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // 3. Environment variables override everything
            .add_source(
                Environment::with_prefix("THREADLINE")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.origins")
                    .with_list_parse_key("llm.groq_models")
                    .with_list_parse_key("upload.allowed_types")
                    .with_list_parse_key("auth.authorized_parties")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;
        cfg.load_secrets();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));
        builder.build()?.try_deserialize()
    }

    /// Load config from an in-memory TOML document
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from_str(toml, FileFormat::Toml));
        builder.build()?.try_deserialize()
    }

    fn load_secrets(&mut self) {
        let secret = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(uri) = secret("MONGODB_URI") {
            self.mongodb_uri = uri;
        }
        // Missing LLM keys are allowed; the selector fails closed per request
        self.groq_api_key = secret("GROQ_API_KEY");
        self.openrouter_api_key = secret("OPENROUTER_API_KEY");
        self.clerk_jwt_key = secret("CLERK_JWT_KEY");
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.backend == DatabaseBackend::Mongodb && self.mongodb_uri.is_empty() {
            return Err(ConfigError::Message(
                "MONGODB_URI environment variable is required".to_string(),
            ));
        }
        if self.auth.enabled && self.clerk_jwt_key.is_none() {
            return Err(ConfigError::Message(
                "CLERK_JWT_KEY environment variable is required when auth is enabled".to_string(),
            ));
        }
        if self.upload.max_files == 0 || self.upload.max_file_size_bytes == 0 {
            return Err(ConfigError::Message(
                "upload limits must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn selector_config(&self) -> SelectorConfig {
        SelectorConfig {
            groq_models: self.llm.groq_models.clone(),
            openai_image_model: self.llm.openai_image_model.clone(),
            gemini_image_model: self.llm.gemini_image_model.clone(),
        }
    }

    pub fn server_keys(&self) -> ServerKeys {
        ServerKeys {
            groq: self.groq_api_key.clone(),
            openrouter: self.openrouter_api_key.clone(),
        }
    }

    pub fn client_factory(&self) -> HttpClientFactory {
        let urls = &self.llm.base_urls;
        [
            (Provider::Groq, &urls.groq),
            (Provider::OpenAI, &urls.openai),
            (Provider::Gemini, &urls.gemini),
            (Provider::OpenRouter, &urls.openrouter),
        ]
        .into_iter()
        .fold(HttpClientFactory::new(), |factory, (provider, url)| match url {
            Some(url) => factory.with_base_url(provider, url.clone()),
            None => factory,
        })
    }

    /// Request body ceiling for the upload route
    pub fn upload_body_limit(&self) -> usize {
        // One file over the count limit still parses, so it gets a VALIDATION error
        self.upload
            .max_files
            .saturating_add(1)
            .saturating_mul(self.upload.max_file_size_bytes)
            .saturating_add(1024 * 1024)
    }
}
