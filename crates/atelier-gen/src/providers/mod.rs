//! Provider registry
//!
//! Maps provider names to concrete implementations.

pub mod gemini;
pub mod mock;

use crate::config::AtelierConfig;
use crate::provider::GenerationService;
use atelier_core::{AtelierError, Result};
use std::sync::Arc;

/// Create a service by name with configuration
pub fn create_service(name: &str, config: &AtelierConfig) -> Result<Arc<dyn GenerationService>> {
    if !config.is_enabled(name) {
        return Err(AtelierError::ConfigError(format!(
            "Provider '{}' is disabled in config",
            name
        )));
    }

    match name {
        "mock" => Ok(Arc::new(mock::MockService::new())),
        "gemini" => Ok(Arc::new(gemini::GeminiService::from_config(config)?)),
        _ => Err(AtelierError::ConfigError(format!(
            "Unknown provider '{}'. Available: {}",
            name,
            available_providers().join(", ")
        ))),
    }
}

/// List all available provider names
pub fn available_providers() -> Vec<&'static str> {
    vec!["mock", "gemini"]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;

    #[test]
    fn test_create_mock() {
        let service = create_service("mock", &AtelierConfig::default()).unwrap();
        assert_eq!(service.name(), "mock");
    }

    #[test]
    fn test_unknown_provider() {
        let err = create_service("dalle", &AtelierConfig::default()).err().unwrap();
        assert!(err.to_string().contains("mock, gemini"));
    }

    #[test]
    fn test_disabled_provider() {
        let mut config = AtelierConfig::default();
        config.providers.insert(
            "gemini".to_string(),
            ProviderConfig {
                api_key: Some("key".to_string()),
                enabled: Some(false),
                ..Default::default()
            },
        );
        assert!(matches!(
            create_service("gemini", &config),
            Err(AtelierError::ConfigError(_))
        ));
    }
}
