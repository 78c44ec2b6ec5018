//! Variation expansion
//!
//! Turns one base prompt into an ordered list of distinct prompts with a
//! single call to the text model.

use crate::asset::{validate_count, AssetKind};
use crate::provider::GenerationService;
use crate::retry::{with_retry, RetryPolicy, Sleeper};
use atelier_core::Result;

/// Build the instruction sent to the text model
pub fn variation_instruction(base_prompt: &str, kind: AssetKind, count: usize) -> String {
    format!(
        "Generate exactly {count} distinct prompt variations for a set of {kind} assets \
         based on the theme: \"{base}\". Every variation must keep the theme but differ \
         from the others in viewing angle, color palette, and level of detail. \
         Each variation is a single short visual description without numbering. \
         Respond with a JSON array of {count} strings and nothing else.",
        count = count,
        kind = kind,
        base = base_prompt.trim(),
    )
}

/// Parse the text model's payload into a list of prompts.
///
/// Accepts a bare JSON array or one wrapped in a Markdown code fence.
/// Blank entries are dropped. Returns `None` when nothing usable remains.
pub fn parse_variations(payload: &str) -> Option<Vec<String>> {
    let trimmed = strip_code_fence(payload.trim());
    let parsed: Vec<String> = serde_json::from_str(trimmed).ok()?;
    let variations: Vec<String> = parsed
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if variations.is_empty() {
        None
    } else {
        Some(variations)
    }
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Drop an optional language tag on the opening fence line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Force the list to exactly `count` entries: extra entries are dropped and
/// missing ones are filled with the base prompt
fn normalize(mut variations: Vec<String>, base_prompt: &str, count: usize) -> Vec<String> {
    variations.truncate(count);
    while variations.len() < count {
        variations.push(base_prompt.to_string());
    }
    variations
}

/// Expand `base_prompt` into `count` prompts.
///
/// The service call is retried under `policy`; failures that survive retry
/// propagate. Unparsable or empty output falls back to `count` copies of the
/// base prompt. `count` must be within `1..=MAX_VARIATIONS`.
pub fn expand_variations(
    service: &dyn GenerationService,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    base_prompt: &str,
    kind: AssetKind,
    count: usize,
) -> Result<Vec<String>> {
    validate_count(count)?;
    let base_prompt = base_prompt.trim();
    let instruction = variation_instruction(base_prompt, kind, count);

    let payload = with_retry(policy, sleeper, "expand_variations", || {
        service.generate_string_list(&instruction)
    })?;

    match parse_variations(&payload) {
        Some(variations) => {
            if variations.len() != count {
                tracing::warn!(
                    expected = count,
                    received = variations.len(),
                    "variation count mismatch, normalizing"
                );
            }
            Ok(normalize(variations, base_prompt, count))
        }
        None => {
            tracing::warn!(
                payload_len = payload.len(),
                "could not parse variations, repeating base prompt"
            );
            Ok(vec![base_prompt.to_string(); count])
        }
    }
}
