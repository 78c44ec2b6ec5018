//! Print expanded variation prompts

use anyhow::Result;
use atelier_gen::asset::validate_count;
use atelier_gen::variations::expand_variations;
use atelier_gen::{AssetKind, ThreadSleeper};

pub fn run(prompt: &str, kind: &str, count: usize, provider: Option<&str>) -> Result<()> {
    let kind: AssetKind = kind.parse()?;
    validate_count(count)?;

    let config = super::load_config()?;
    let (service, _) = super::service_for(provider, &config)?;

    let variations = expand_variations(
        service.as_ref(),
        &config.generation.retry_policy(),
        &ThreadSleeper,
        prompt,
        kind,
        count,
    )?;

    for (i, variation) in variations.iter().enumerate() {
        println!("{:>3}. {}", i + 1, variation);
    }
    Ok(())
}
