use std::sync::Arc;

use atelier_gen::orchestrator::RunSettings;
use atelier_gen::{CredentialBroker, GenerationService, Sleeper};

/// Shared state available to all handlers via `State<AppState>`
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn GenerationService>,
    pub credentials: Arc<dyn CredentialBroker>,
    pub sleeper: Arc<dyn Sleeper>,
    pub settings: RunSettings,
}

impl AppState {
    pub fn new(
        service: Arc<dyn GenerationService>,
        credentials: Arc<dyn CredentialBroker>,
        sleeper: Arc<dyn Sleeper>,
        settings: RunSettings,
    ) -> Self {
        Self {
            service,
            credentials,
            sleeper,
            settings,
        }
    }
}
