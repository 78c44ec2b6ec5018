//! Generation service trait and the wire-level types it exchanges
//!
//! A `GenerationService` is the boundary to the remote AI service. Every
//! failure it returns is an `AtelierError::Service` carrying a
//! `ServiceErrorKind`, so the pipeline never inspects message text.

use crate::asset::AssetContent;
use atelier_core::Result;
use serde::{Deserialize, Serialize};

/// A long-running video generation job tracked by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoJob {
    /// Provider-specific operation name
    pub remote_id: String,
    /// The prompt the job was submitted with
    pub prompt: String,
}

/// Result of polling a video job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPollResult {
    /// Still processing
    Processing,
    /// Completed; carries the download location if the service reported one
    Complete { download_url: Option<String> },
    /// Failed with error message
    Failed(String),
}

/// Status returned by a provider health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Available,
    NoApiKey,
}

/// Trait implemented by each generation service (Gemini, Mock)
pub trait GenerationService: Send + Sync {
    /// Service name (e.g. "gemini", "mock")
    fn name(&self) -> &str;

    /// Check whether the service has what it needs to accept requests
    fn health_check(&self) -> ProviderStatus;

    /// Ask the text model for a JSON array of strings.
    ///
    /// Returns the raw text payload; parsing is the caller's concern.
    fn generate_string_list(&self, instruction: &str) -> Result<String>;

    /// Ask the image model for images. Returns every inline image payload
    /// in response order, possibly none.
    fn generate_images(&self, prompt: &str, aspect_ratio: &str) -> Result<Vec<AssetContent>>;

    /// Submit a video generation job
    fn submit_video(&self, prompt: &str) -> Result<VideoJob>;

    /// Poll the status of a video job
    fn poll_video(&self, job: &VideoJob) -> Result<JobPollResult>;

    /// Download a finished video
    fn download_video(&self, download_url: &str) -> Result<AssetContent>;
}
