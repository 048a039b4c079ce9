use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use threadline_api::{
    auth::JwtVerifier,
    chat::reconcile::spawn_reconciler,
    config::{Config, DatabaseBackend, StorageBackend},
    router,
    storage::{MemoryObjectStore, ObjectStore, S3ObjectStore},
    AppState,
};
use threadline_persist::{MemoryPersistenceClient, MongoPersistenceClient, PersistenceClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting Threadline API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let persist: Arc<dyn PersistenceClient> = match config.database.backend {
        DatabaseBackend::Mongodb => {
            tracing::info!("Connecting to MongoDB");
            let client =
                MongoPersistenceClient::connect(&config.mongodb_uri, &config.database.database)
                    .await?;
            tracing::info!("MongoDB connected");
            Arc::new(client)
        }
        DatabaseBackend::Memory => {
            tracing::warn!("Using in-memory persistence; data is lost on restart");
            Arc::new(MemoryPersistenceClient::new())
        }
    };

    let storage: Arc<dyn ObjectStore> = match config.storage.backend {
        StorageBackend::S3 => Arc::new(S3ObjectStore::from_config(&config.storage).await?),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory object storage");
            Arc::new(MemoryObjectStore::new())
        }
    };

    let verifier = if config.auth.enabled {
        let pem = config
            .clerk_jwt_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("CLERK_JWT_KEY is required when auth is enabled"))?;
        Some(JwtVerifier::from_rsa_pem(pem, config.auth.authorized_parties.clone())?)
    } else {
        tracing::warn!("Auth disabled; trusting the x-user-id header");
        None
    };

    if config.groq_api_key.is_none() {
        tracing::warn!("GROQ_API_KEY is not set; Groq models and titles will fail");
    }

    let clients = Arc::new(config.client_factory());

    let _reconciler = spawn_reconciler(
        Arc::clone(&persist),
        Duration::from_secs(config.llm.reconcile_interval_secs),
        Duration::from_secs(config.llm.stale_placeholder_secs),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, persist, storage, clients, verifier));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
