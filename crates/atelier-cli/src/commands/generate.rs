//! Generate and export a batch of assets

use anyhow::Result;
use atelier_gen::orchestrator::{GenerationRun, ItemFailure, RunObserver, RunSettings};
use atelier_gen::{
    export_run, AssetKind, ExportFormat, FileQuotaStore, GeneratedAsset, Orchestrator,
    QuotaService, ThreadSleeper, VariationRequest,
};
use chrono::NaiveDate;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub fn run(
    prompt: &str,
    kind: &str,
    count: Option<usize>,
    provider: Option<&str>,
    output_dir: &str,
    format: &str,
) -> Result<()> {
    let kind: AssetKind = kind.parse()?;
    let format: ExportFormat = format.parse()?;
    let config = super::load_config()?;
    let (service, credentials) = super::service_for(provider, &config)?;

    let mut settings = RunSettings::from_config(&config.generation);
    if let Some(count) = count {
        settings.variation_count = count;
    }

    let quota = FileQuotaStore::new(&config.quota.path, config.quota.daily_limit);
    let today = chrono::Local::now().date_naive();
    let request = reserve_run(prompt, kind, settings.variation_count, &quota, today)?;

    println!(
        "Generating {} {} assets for '{}' with {}...",
        request.count,
        request.kind,
        request.base_prompt,
        service.name()
    );

    let orchestrator = Orchestrator::new(service, credentials, Arc::new(ThreadSleeper), settings);
    let mut observer = ConsoleObserver;
    let run = orchestrator.run_generation(&request.base_prompt, request.kind, &mut observer)?;

    if !run.assets.is_empty() {
        let exported = export_run(&run.assets, format, Path::new(output_dir))?;
        println!("Exported {} assets to {}", exported.len(), output_dir);
        for asset in &exported {
            println!("  {}", asset.path.display());
        }
    }

    if !run.item_failures.is_empty() {
        println!("Skipped {} variations", run.item_failures.len());
    }

    match run.terminal_error {
        Some(failure) => anyhow::bail!(failure.user_message()),
        None => Ok(()),
    }
}

/// Validate the request, then take one unit of today's quota.
///
/// Invalid requests never consume quota.
fn reserve_run(
    prompt: &str,
    kind: AssetKind,
    count: usize,
    quota: &dyn QuotaService,
    today: NaiveDate,
) -> Result<VariationRequest> {
    let request = VariationRequest::new(prompt, kind, count)?;
    if !quota.check_and_consume(today)? {
        anyhow::bail!(
            "Daily limit of {} generations reached. Try again tomorrow.",
            quota.daily_limit()
        );
    }
    Ok(request)
}

/// Prints run progress to the terminal
struct ConsoleObserver;

impl RunObserver for ConsoleObserver {
    fn on_progress(&mut self, percent: u8) {
        print!("\r[{:>3}%]", percent);
        std::io::stdout().flush().ok();
    }

    fn on_asset(&mut self, asset: &GeneratedAsset) {
        println!("\r  + {}", asset.source_prompt);
    }

    fn on_item_failed(&mut self, failure: &ItemFailure) {
        println!("\r  - skipped #{}: {}", failure.index + 1, failure.message);
    }

    fn on_finished(&mut self, _run: &GenerationRun) {
        print!("\r       \r");
        std::io::stdout().flush().ok();
    }
}
