use std::sync::Arc;

use threadline_llm::{ClientFactory, ProviderSelector};
use threadline_persist::PersistenceClient;

use crate::{auth::JwtVerifier, config::Config, storage::ObjectStore};

/// Shared application state passed to all handlers
///
/// Everything behind a trait is an `Arc<dyn ...>` so tests can swap in
/// in-memory persistence, storage and scripted provider clients.
pub struct AppState {
    pub config: Arc<Config>,
    pub persist: Arc<dyn PersistenceClient>,
    pub storage: Arc<dyn ObjectStore>,
    pub clients: Arc<dyn ClientFactory>,
    pub selector: ProviderSelector,
    pub verifier: Option<JwtVerifier>,
}

impl AppState {
    pub fn new(
        config: Config,
        persist: Arc<dyn PersistenceClient>,
        storage: Arc<dyn ObjectStore>,
        clients: Arc<dyn ClientFactory>,
        verifier: Option<JwtVerifier>,
    ) -> Self {
        let selector = ProviderSelector::new(config.selector_config(), config.server_keys());
        Self {
            config: Arc::new(config),
            persist,
            storage,
            clients,
            selector,
            verifier,
        }
    }
}
