//! Layered configuration system
//!
//! Config is loaded with three layers of precedence (highest wins):
//! 1. Environment variables: `ATELIER_{PROVIDER}_API_KEY`, `ATELIER_{PROVIDER}_API_URL`
//! 2. Project-local: `.atelier/config.toml`
//! 3. Global: `~/.atelier/config.toml`

use crate::retry::RetryPolicy;
use atelier_core::{AtelierError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const KNOWN_PROVIDERS: [&str; 1] = ["gemini"];

/// Provider-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub text_model: Option<String>,
    #[serde(default)]
    pub image_model: Option<String>,
    #[serde(default)]
    pub video_model: Option<String>,
}

/// Generation settings as written in a config file; unset keys fall through
/// to lower layers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GenerationFile {
    default_provider: Option<String>,
    variation_count: Option<usize>,
    pacing_ms: Option<u64>,
    max_attempts: Option<u32>,
    initial_delay_ms: Option<u64>,
    max_jitter_ms: Option<u64>,
    poll_interval_secs: Option<u64>,
    max_poll_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct QuotaFile {
    daily_limit: Option<u32>,
    path: Option<String>,
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AtelierConfigFile {
    #[serde(default)]
    providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    generation: GenerationFile,
    #[serde(default)]
    quota: QuotaFile,
}

/// Resolved generation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub default_provider: String,
    /// How many variations a run asks for
    pub variation_count: usize,
    /// Fixed wait between consecutive fetches
    pub pacing_ms: u64,
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_jitter_ms: u64,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_provider: "gemini".to_string(),
            variation_count: 20,
            pacing_ms: 4000,
            max_attempts: 5,
            initial_delay_ms: 4000,
            max_jitter_ms: 1000,
            poll_interval_secs: 15,
            max_poll_attempts: 240,
        }
    }
}

impl GenerationConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_jitter: Duration::from_millis(self.max_jitter_ms),
        }
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Resolved quota settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaConfig {
    pub daily_limit: u32,
    pub path: PathBuf,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: 10,
            path: PathBuf::from(".atelier/quota.toml"),
        }
    }
}

/// Resolved configuration with environment variable overrides applied
#[derive(Debug, Clone, Default)]
pub struct AtelierConfig {
    pub providers: HashMap<String, ProviderConfig>,
    pub generation: GenerationConfig,
    pub quota: QuotaConfig,
}

impl AtelierConfig {
    /// Load config with layered precedence: global < project < env vars
    pub fn load() -> Result<Self> {
        let mut config = AtelierConfigFile::default();

        // Layer 1: Global config (~/.atelier/config.toml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                Self::merge_into(&mut config, global);
            }
        }

        // Layer 2: Project-local config (.atelier/config.toml)
        let local_path = PathBuf::from(".atelier/config.toml");
        if local_path.exists() {
            let local = Self::load_file(&local_path)?;
            Self::merge_into(&mut config, local);
        }

        // Layer 3: Environment variable overrides
        Self::apply_env_overrides(&mut config);

        Ok(Self::resolve(config))
    }

    /// Load config from a specific file path only (for testing)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        Self::apply_env_overrides(&mut config);
        Ok(Self::resolve(config))
    }

    /// Get API key for a provider
    pub fn api_key(&self, provider_name: &str) -> Option<&str> {
        self.providers
            .get(provider_name)
            .and_then(|p| p.api_key.as_deref())
    }

    /// Get API URL override for a provider
    pub fn api_url(&self, provider_name: &str) -> Option<&str> {
        self.providers
            .get(provider_name)
            .and_then(|p| p.api_url.as_deref())
    }

    /// Provider section, if any
    pub fn provider(&self, provider_name: &str) -> Option<&ProviderConfig> {
        self.providers.get(provider_name)
    }

    /// Check if a provider is enabled
    pub fn is_enabled(&self, provider_name: &str) -> bool {
        self.providers
            .get(provider_name)
            .and_then(|p| p.enabled)
            .unwrap_or(true)
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".atelier").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<AtelierConfigFile> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            AtelierError::ConfigError(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }

    fn merge_into(base: &mut AtelierConfigFile, overlay: AtelierConfigFile) {
        for (name, provider) in overlay.providers {
            let entry = base.providers.entry(name).or_default();
            if provider.api_key.is_some() {
                entry.api_key = provider.api_key;
            }
            if provider.api_url.is_some() {
                entry.api_url = provider.api_url;
            }
            if provider.enabled.is_some() {
                entry.enabled = provider.enabled;
            }
            if provider.text_model.is_some() {
                entry.text_model = provider.text_model;
            }
            if provider.image_model.is_some() {
                entry.image_model = provider.image_model;
            }
            if provider.video_model.is_some() {
                entry.video_model = provider.video_model;
            }
        }

        let (g, o) = (&mut base.generation, overlay.generation);
        g.default_provider = o.default_provider.or(g.default_provider.take());
        g.variation_count = o.variation_count.or(g.variation_count);
        g.pacing_ms = o.pacing_ms.or(g.pacing_ms);
        g.max_attempts = o.max_attempts.or(g.max_attempts);
        g.initial_delay_ms = o.initial_delay_ms.or(g.initial_delay_ms);
        g.max_jitter_ms = o.max_jitter_ms.or(g.max_jitter_ms);
        g.poll_interval_secs = o.poll_interval_secs.or(g.poll_interval_secs);
        g.max_poll_attempts = o.max_poll_attempts.or(g.max_poll_attempts);

        let (q, o) = (&mut base.quota, overlay.quota);
        q.daily_limit = o.daily_limit.or(q.daily_limit);
        q.path = o.path.or(q.path.take());
    }

    fn apply_env_overrides(config: &mut AtelierConfigFile) {
        for name in &KNOWN_PROVIDERS {
            let upper = name.to_uppercase();
            if let Ok(key) = std::env::var(format!("ATELIER_{}_API_KEY", upper)) {
                let entry = config.providers.entry(name.to_string()).or_default();
                entry.api_key = Some(key);
            }
            if let Ok(url) = std::env::var(format!("ATELIER_{}_API_URL", upper)) {
                let entry = config.providers.entry(name.to_string()).or_default();
                entry.api_url = Some(url);
            }
        }
    }

    fn resolve(file: AtelierConfigFile) -> Self {
        let defaults = GenerationConfig::default();
        let g = file.generation;
        let generation = GenerationConfig {
            default_provider: g.default_provider.unwrap_or(defaults.default_provider),
            variation_count: g.variation_count.unwrap_or(defaults.variation_count).max(1),
            pacing_ms: g.pacing_ms.unwrap_or(defaults.pacing_ms),
            max_attempts: g.max_attempts.unwrap_or(defaults.max_attempts).max(1),
            initial_delay_ms: g.initial_delay_ms.unwrap_or(defaults.initial_delay_ms),
            max_jitter_ms: g.max_jitter_ms.unwrap_or(defaults.max_jitter_ms),
            poll_interval_secs: g.poll_interval_secs.unwrap_or(defaults.poll_interval_secs),
            max_poll_attempts: g.max_poll_attempts.unwrap_or(defaults.max_poll_attempts),
        };

        let quota_defaults = QuotaConfig::default();
        let quota = QuotaConfig {
            daily_limit: file.quota.daily_limit.unwrap_or(quota_defaults.daily_limit),
            path: file.quota.path.map(PathBuf::from).unwrap_or(quota_defaults.path),
        };

        AtelierConfig {
            providers: file.providers,
            generation,
            quota,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_config(content: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("atelier_config_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_config_from_file() {
        let config_str = r#"
[providers.gemini]
image_model = "custom-image-model"
enabled = true

[providers.mock]
enabled = false

[generation]
variation_count = 8
pacing_ms = 250

[quota]
daily_limit = 3
path = "/tmp/atelier-quota.toml"
"#;
        let path = temp_config(config_str);
        let config = AtelierConfig::load_from_file(&path).unwrap();

        assert!(config.is_enabled("gemini"));
        assert!(!config.is_enabled("mock"));
        assert_eq!(
            config.provider("gemini").and_then(|p| p.image_model.as_deref()),
            Some("custom-image-model")
        );
        assert_eq!(config.generation.variation_count, 8);
        assert_eq!(config.generation.pacing(), Duration::from_millis(250));
        // Unset keys keep their defaults
        assert_eq!(config.generation.max_attempts, 5);
        assert_eq!(config.generation.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.quota.daily_limit, 3);
        assert_eq!(config.quota.path, PathBuf::from("/tmp/atelier-quota.toml"));

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_env_var_override() {
        let config_str = r#"
[providers.gemini]
api_key = "file-key"
api_url = "https://file.example.com"
"#;
        let path = temp_config(config_str);

        std::env::set_var("ATELIER_GEMINI_API_KEY", "env-key-override");

        let config = AtelierConfig::load_from_file(&path).unwrap();
        assert_eq!(config.api_key("gemini"), Some("env-key-override"));

        std::env::remove_var("ATELIER_GEMINI_API_KEY");
        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_merge_overlay_wins_only_where_set() {
        let mut base: AtelierConfigFile = toml::from_str(
            r#"
[providers.gemini]
api_key = "global"
text_model = "global-text"

[generation]
variation_count = 12
pacing_ms = 1000
"#,
        )
        .unwrap();
        let overlay: AtelierConfigFile = toml::from_str(
            r#"
[providers.gemini]
text_model = "local-text"

[generation]
pacing_ms = 2000
"#,
        )
        .unwrap();

        AtelierConfig::merge_into(&mut base, overlay);
        let config = AtelierConfig::resolve(base);
        assert_eq!(config.api_key("gemini"), Some("global"));
        assert_eq!(
            config.provider("gemini").and_then(|p| p.text_model.as_deref()),
            Some("local-text")
        );
        assert_eq!(config.generation.variation_count, 12);
        assert_eq!(config.generation.pacing_ms, 2000);
    }

    #[test]
    fn test_defaults() {
        let config = AtelierConfig::default();
        assert_eq!(config.generation.default_provider, "gemini");
        assert_eq!(config.generation.variation_count, 20);
        assert_eq!(config.generation.retry_policy(), RetryPolicy::default());
        assert_eq!(config.quota.daily_limit, 10);
        assert_eq!(config.api_key("nonexistent"), None);
        assert!(config.is_enabled("nonexistent")); // defaults to true
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let path = temp_config("[generation\nbroken");
        let err = AtelierConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, AtelierError::ConfigError(_)));
        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(path.parent().unwrap()).ok();
    }
}
