//! CLI command implementations

pub mod generate;
pub mod kinds;
pub mod quota;
pub mod serve;
pub mod variations;

use anyhow::{Context, Result};
use atelier_gen::providers::create_service;
use atelier_gen::{
    AtelierConfig, ConfigCredentialBroker, CredentialBroker, GenerationService,
    StaticCredentialBroker,
};
use std::sync::Arc;

pub(crate) fn load_config() -> Result<AtelierConfig> {
    AtelierConfig::load().context("Failed to load config")
}

/// Resolve the provider and the credential broker that goes with it
pub(crate) fn service_for(
    provider: Option<&str>,
    config: &AtelierConfig,
) -> Result<(Arc<dyn GenerationService>, Arc<dyn CredentialBroker>)> {
    let name = provider.unwrap_or(&config.generation.default_provider);
    let service = create_service(name, config)?;

    let credentials: Arc<dyn CredentialBroker> = if name == "mock" {
        Arc::new(StaticCredentialBroker::present())
    } else {
        Arc::new(ConfigCredentialBroker::new(config, name))
    };

    Ok((service, credentials))
}
