//! Atelier Gen - themed asset batch generation
//!
//! Expands one prompt into a set of variations, fetches an image or video for
//! each from a generation service (Gemini or a local mock) under retry and
//! pacing, strips white backgrounds where the asset kind calls for it, and
//! exports the results.

pub mod asset;
pub mod background;
pub mod config;
pub mod credentials;
pub mod export;
pub mod fetcher;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod quota;
pub mod retry;
pub mod templates;
pub mod variations;

pub use asset::{AssetContent, AssetKind, GeneratedAsset, VariationRequest, MAX_VARIATIONS};
pub use config::AtelierConfig;
pub use credentials::{ConfigCredentialBroker, CredentialBroker, StaticCredentialBroker};
pub use export::{export_asset, export_run, ExportFormat, ExportedAsset};
pub use fetcher::AssetFetcher;
pub use orchestrator::{
    GenerationRun, ItemFailure, Orchestrator, RunFailure, RunObserver, RunSettings,
};
pub use provider::{GenerationService, JobPollResult, ProviderStatus, VideoJob};
pub use quota::{FileQuotaStore, MemoryQuotaStore, QuotaService};
pub use retry::{with_retry, RetryPolicy, Sleeper, ThreadSleeper};
