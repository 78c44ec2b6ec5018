//! Show today's quota usage

use anyhow::Result;
use atelier_gen::{FileQuotaStore, QuotaService};

pub fn run() -> Result<()> {
    let config = super::load_config()?;
    let store = FileQuotaStore::new(&config.quota.path, config.quota.daily_limit);
    let today = chrono::Local::now().date_naive();
    let used = store.used(today)?;

    println!(
        "{}: {}/{} generations used ({} remaining)",
        today,
        used,
        store.daily_limit(),
        store.daily_limit().saturating_sub(used)
    );
    println!("Quota file: {}", config.quota.path.display());
    Ok(())
}
