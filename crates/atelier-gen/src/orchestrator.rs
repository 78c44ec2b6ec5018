//! Batch generation runs
//!
//! One run expands a base prompt into variations, then fetches them one at a
//! time with a pacing delay in between. Item failures are skipped, except
//! rate limiting, which stops the whole run.

use crate::asset::{AssetKind, GeneratedAsset, VariationRequest};
use crate::config::GenerationConfig;
use crate::credentials::CredentialBroker;
use crate::fetcher::{AssetFetcher, PollPolicy};
use crate::provider::GenerationService;
use crate::retry::{RetryPolicy, Sleeper};
use crate::variations::expand_variations;
use atelier_core::{AtelierError, Result, ServiceErrorKind};
use std::sync::Arc;
use std::time::Duration;

/// Why a run ended without a usable result
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunFailure {
    #[error("The service is rate limiting requests. Please wait a minute and try again.")]
    RateLimited,

    #[error("The API key was rejected. Please select a valid API key.")]
    AuthenticationInvalid,

    #[error("Failed to generate assets: {0}")]
    VariationsFailed(String),

    #[error("No assets could be generated. Please try again later.")]
    EmptyRun,
}

impl RunFailure {
    /// Short message suitable for showing to a user
    pub fn user_message(&self) -> String {
        match self {
            RunFailure::VariationsFailed(_) => "Failed to generate assets.".to_string(),
            other => other.to_string(),
        }
    }

    fn from_expansion_error(err: &AtelierError) -> Self {
        if err.is_rate_limited() {
            RunFailure::RateLimited
        } else if err.is_authentication() {
            RunFailure::AuthenticationInvalid
        } else {
            RunFailure::VariationsFailed(err.to_string())
        }
    }
}

/// A variation that was skipped
#[derive(Debug, Clone)]
pub struct ItemFailure {
    pub index: usize,
    pub prompt: String,
    pub kind: Option<ServiceErrorKind>,
    pub authentication: bool,
    pub message: String,
}

/// Outcome of one generation run
#[derive(Debug)]
pub struct GenerationRun {
    pub request: VariationRequest,
    /// Successful assets, in prompt order
    pub assets: Vec<GeneratedAsset>,
    pub progress_percent: u8,
    pub terminal_error: Option<RunFailure>,
    pub item_failures: Vec<ItemFailure>,
}

impl GenerationRun {
    fn new(request: VariationRequest) -> Self {
        Self {
            request,
            assets: Vec::new(),
            progress_percent: 0,
            terminal_error: None,
            item_failures: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.terminal_error.is_none()
    }
}

/// Receives run events as they happen
pub trait RunObserver {
    fn on_progress(&mut self, _percent: u8) {}

    fn on_asset(&mut self, _asset: &GeneratedAsset) {}

    fn on_item_failed(&mut self, _failure: &ItemFailure) {}

    /// Called once at the end of every run; progress display should be cleared
    fn on_finished(&mut self, _run: &GenerationRun) {}
}

impl RunObserver for () {}

/// Tunables for a run
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub variation_count: usize,
    pub pacing: Duration,
    pub retry: RetryPolicy,
    pub poll: PollPolicy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from_config(&GenerationConfig::default())
    }
}

impl RunSettings {
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            variation_count: config.variation_count,
            pacing: config.pacing(),
            retry: config.retry_policy(),
            poll: PollPolicy {
                interval: config.poll_interval(),
                max_attempts: config.max_poll_attempts,
            },
        }
    }
}

/// Drives variation expansion and asset fetching for a run
pub struct Orchestrator {
    service: Arc<dyn GenerationService>,
    credentials: Arc<dyn CredentialBroker>,
    sleeper: Arc<dyn Sleeper>,
    settings: RunSettings,
}

impl Orchestrator {
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

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Run a full batch for `base_prompt`.
    ///
    /// Only an invalid request is an `Err`; everything that goes wrong once
    /// the run has started is reported on the returned `GenerationRun`.
    pub fn run_generation(
        &self,
        base_prompt: &str,
        kind: AssetKind,
        observer: &mut dyn RunObserver,
    ) -> Result<GenerationRun> {
        let request = VariationRequest::new(base_prompt, kind, self.settings.variation_count)?;
        let mut run = GenerationRun::new(request);

        tracing::info!(
            prompt = %run.request.base_prompt,
            %kind,
            count = run.request.count,
            provider = self.service.name(),
            "starting generation run"
        );
        observer.on_progress(0);

        self.execute(&mut run, observer);

        match &run.terminal_error {
            Some(failure) => tracing::warn!(
                assets = run.assets.len(),
                skipped = run.item_failures.len(),
                error = %failure,
                "generation run failed"
            ),
            None => tracing::info!(
                assets = run.assets.len(),
                skipped = run.item_failures.len(),
                "generation run finished"
            ),
        }
        observer.on_finished(&run);
        Ok(run)
    }

    fn execute(&self, run: &mut GenerationRun, observer: &mut dyn RunObserver) {
        let kind = run.request.kind;
        let prompts = match expand_variations(
            self.service.as_ref(),
            &self.settings.retry,
            self.sleeper.as_ref(),
            &run.request.base_prompt,
            kind,
            run.request.count,
        ) {
            Ok(prompts) => prompts,
            Err(e) => {
                tracing::error!(error = %e, "variation expansion failed");
                if e.rejects_credential() {
                    self.reselect_credential();
                }
                run.terminal_error = Some(RunFailure::from_expansion_error(&e));
                return;
            }
        };

        let fetcher = AssetFetcher::new(
            self.service.as_ref(),
            self.credentials.as_ref(),
            self.sleeper.as_ref(),
        )
        .with_retry_policy(self.settings.retry)
        .with_poll_policy(self.settings.poll);

        let total = prompts.len();
        for (index, prompt) in prompts.iter().enumerate() {
            match fetcher.fetch(prompt, kind) {
                Ok(content) => {
                    let asset = GeneratedAsset::new(content, kind, prompt);
                    tracing::info!(index, id = %asset.id, "asset generated");
                    observer.on_asset(&asset);
                    run.assets.push(asset);

                    run.progress_percent = progress_percent(run.assets.len(), total);
                    observer.on_progress(run.progress_percent);
                }
                Err(e) if e.is_rate_limited() => {
                    tracing::warn!(index, error = %e, "rate limited, aborting run");
                    run.terminal_error = Some(RunFailure::RateLimited);
                    return;
                }
                Err(e) => {
                    tracing::warn!(index, prompt = %prompt, error = %e, "skipping variation");
                    if e.rejects_credential() {
                        self.reselect_credential();
                    }
                    let failure = ItemFailure {
                        index,
                        prompt: prompt.clone(),
                        kind: e.service_kind(),
                        authentication: e.is_authentication(),
                        message: e.to_string(),
                    };
                    observer.on_item_failed(&failure);
                    run.item_failures.push(failure);
                }
            }

            if index + 1 < total {
                self.sleeper.sleep(self.settings.pacing);
            }
        }

        if run.assets.is_empty() {
            let auth_failed = run.item_failures.iter().any(|f| f.authentication);
            run.terminal_error = Some(if auth_failed {
                RunFailure::AuthenticationInvalid
            } else {
                RunFailure::EmptyRun
            });
        }
    }

    fn reselect_credential(&self) {
        if let Err(e) = self.credentials.prompt_selection() {
            tracing::warn!(error = %e, "credential reselection failed");
        }
    }
}

/// `round(100 * completed / total)`, clamped to 100
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (100.0 * completed as f64 / total as f64).round();
    pct.clamp(0.0, 100.0) as u8
}
