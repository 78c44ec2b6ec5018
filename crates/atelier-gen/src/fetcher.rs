//! Asset fetching
//!
//! Turns one variation prompt into asset bytes. Static kinds are a single
//! image request; motion kinds submit a video job and poll it to completion.

use crate::asset::{AssetContent, AssetKind};
use crate::background::strip_white_background;
use crate::credentials::CredentialBroker;
use crate::provider::{GenerationService, JobPollResult, VideoJob};
use crate::retry::{with_retry, RetryPolicy, Sleeper};
use crate::templates::apply_template;
use atelier_core::{AtelierError, Result};
use std::time::Duration;

/// Aspect ratio requested for every static image
pub const STATIC_ASPECT_RATIO: &str = "1:1";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;
const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 240;

/// How video jobs are polled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// Fetches single assets from a generation service
pub struct AssetFetcher<'a> {
    service: &'a dyn GenerationService,
    credentials: &'a dyn CredentialBroker,
    sleeper: &'a dyn Sleeper,
    retry: RetryPolicy,
    poll: PollPolicy,
}

impl<'a> AssetFetcher<'a> {
    pub fn new(
        service: &'a dyn GenerationService,
        credentials: &'a dyn CredentialBroker,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            service,
            credentials,
            sleeper,
            retry: RetryPolicy::default(),
            poll: PollPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Fetch one asset for `prompt`, post-processed for `kind`.
    ///
    /// The whole fetch runs under the retry policy.
    pub fn fetch(&self, prompt: &str, kind: AssetKind) -> Result<AssetContent> {
        let full_prompt = apply_template(kind, prompt);
        tracing::debug!(%kind, prompt = %full_prompt, "fetching asset");

        if kind.is_motion() {
            self.ensure_credential()?;
            return with_retry(&self.retry, self.sleeper, "fetch_video", || {
                self.fetch_video(&full_prompt)
            });
        }

        let image = with_retry(&self.retry, self.sleeper, "fetch_image", || {
            self.fetch_image(&full_prompt)
        })?;

        if kind.strips_background() {
            Ok(strip_white_background(&image))
        } else {
            Ok(image)
        }
    }

    fn ensure_credential(&self) -> Result<()> {
        if self.credentials.has_credential() {
            return Ok(());
        }

        tracing::info!("motion generation needs a credential, opening selection");
        if let Err(e) = self.credentials.prompt_selection() {
            tracing::warn!(error = %e, "credential selection failed");
        }

        if self.credentials.has_credential() {
            Ok(())
        } else {
            Err(AtelierError::CredentialRequired(
                "Motion generation requires a selected API key".to_string(),
            ))
        }
    }

    fn fetch_image(&self, prompt: &str) -> Result<AssetContent> {
        let images = self.service.generate_images(prompt, STATIC_ASPECT_RATIO)?;
        images.into_iter().next().ok_or_else(|| {
            AtelierError::NoOutputProduced(format!(
                "{} returned no image payload for prompt '{}'",
                self.service.name(),
                prompt
            ))
        })
    }

    fn fetch_video(&self, prompt: &str) -> Result<AssetContent> {
        let job = self.service.submit_video(prompt)?;
        tracing::info!(job = %job.remote_id, "video job submitted");
        let download_url = self.wait_for_video(&job)?;
        self.service.download_video(&download_url)
    }

    fn wait_for_video(&self, job: &VideoJob) -> Result<String> {
        for attempt in 1..=self.poll.max_attempts {
            self.sleeper.sleep(self.poll.interval);

            let status = with_retry(&self.retry, self.sleeper, "poll_video", || {
                self.service.poll_video(job)
            })?;

            match status {
                JobPollResult::Processing => {
                    tracing::debug!(job = %job.remote_id, attempt, "video job still processing");
                }
                JobPollResult::Complete {
                    download_url: Some(url),
                } => return Ok(url),
                JobPollResult::Complete { download_url: None } => {
                    return Err(AtelierError::NoOutputProduced(format!(
                        "Video job {} finished without a video",
                        job.remote_id
                    )));
                }
                JobPollResult::Failed(msg) => {
                    return Err(AtelierError::NoOutputProduced(format!(
                        "Video job {} failed: {}",
                        job.remote_id, msg
                    )));
                }
            }
        }

        Err(AtelierError::NoOutputProduced(format!(
            "Video job {} did not finish after {} polls",
            job.remote_id, self.poll.max_attempts
        )))
    }
}
