//! Credential broker
//!
//! Motion generation needs a credential the user may have to pick
//! interactively. The pipeline only sees this capability, so it runs the
//! same under a terminal, a server, or a test.

use crate::config::AtelierConfig;
use atelier_core::{AtelierError, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Capability to check for, and ask the user for, a service credential
pub trait CredentialBroker: Send + Sync {
    /// Whether a usable credential is currently selected
    fn has_credential(&self) -> bool;

    /// Open the interactive selection flow. May be declined.
    fn prompt_selection(&self) -> Result<()>;
}

/// Broker backed by the loaded configuration. Cannot prompt: selection
/// logs where to put a key and fails.
pub struct ConfigCredentialBroker {
    provider: String,
    has_key: bool,
}

impl ConfigCredentialBroker {
    pub fn new(config: &AtelierConfig, provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            has_key: config.api_key(provider).is_some_and(|k| !k.is_empty()),
        }
    }
}

impl CredentialBroker for ConfigCredentialBroker {
    fn has_credential(&self) -> bool {
        self.has_key
    }

    fn prompt_selection(&self) -> Result<()> {
        tracing::warn!(
            provider = %self.provider,
            "no interactive credential selection available; set ATELIER_{}_API_KEY or add it to .atelier/config.toml",
            self.provider.to_uppercase()
        );
        Err(AtelierError::CredentialRequired(format!(
            "No credential selection available for '{}'",
            self.provider
        )))
    }
}

/// Broker with a fixed answer that counts selection prompts.
///
/// `grant_on_prompt` makes a prompt flip the credential to present, like a
/// user picking a key.
#[derive(Debug, Default)]
pub struct StaticCredentialBroker {
    present: AtomicBool,
    grant_on_prompt: bool,
    prompts: AtomicUsize,
}

impl StaticCredentialBroker {
    pub fn present() -> Self {
        Self {
            present: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }

    pub fn granting_on_prompt() -> Self {
        Self {
            grant_on_prompt: true,
            ..Default::default()
        }
    }

    /// How many times selection was requested
    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl CredentialBroker for StaticCredentialBroker {
    fn has_credential(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    fn prompt_selection(&self) -> Result<()> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if self.grant_on_prompt {
            self.present.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            Err(AtelierError::CredentialRequired(
                "Credential selection declined".to_string(),
            ))
        }
    }
}
