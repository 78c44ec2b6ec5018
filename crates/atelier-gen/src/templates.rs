//! Per-kind prompt templates
//!
//! Each kind wraps the variation prompt in its own framing and style
//! instructions. Kinds whose output gets its background keyed out also carry
//! the isolation clause, so the white-keying filter has a clean background to
//! work with.

use crate::asset::AssetKind;

/// Appended to every kind that goes through background stripping
pub const ISOLATION_CLAUSE: &str =
    "isolated on a pure, solid, high-contrast white background, no shadows, no gradients, clean sharp edges";

/// Appended to motion kinds in place of the isolation clause
pub const LOOP_CLAUSE: &str =
    "smooth seamless looping motion, the final frame flows back into the first, steady camera";

struct Template {
    prefix: &'static str,
    style: &'static [&'static str],
}

fn template_for(kind: AssetKind) -> Template {
    match kind {
        AssetKind::Sticker => Template {
            prefix: "A die-cut sticker of",
            style: &["bold clean outline", "vibrant saturated colors", "thick white border"],
        },
        AssetKind::FlatGraphic => Template {
            prefix: "A flat graphic illustration of",
            style: &["flat solid colors", "simple geometric shapes", "no texture"],
        },
        AssetKind::Render3d => Template {
            prefix: "A volumetric 3D render of",
            style: &["soft clay-like materials", "even studio lighting", "centered object"],
        },
        AssetKind::Mockup => Template {
            prefix: "A professional product mockup featuring",
            style: &["realistic setting", "natural lighting", "commercial photography"],
        },
        AssetKind::Photo => Template {
            prefix: "A high-resolution photograph of",
            style: &["natural lighting", "sharp focus", "shallow depth of field"],
        },
        AssetKind::Stamp => Template {
            prefix: "A vintage postage stamp design of",
            style: &["perforated edges", "engraved line-art detail", "muted print colors"],
        },
        AssetKind::StampStyle => Template {
            prefix: "A minimal vector rubber-stamp illustration of",
            style: &["single ink color", "bold simplified shapes", "slight ink texture"],
        },
        AssetKind::Animation => Template {
            prefix: "A short looping animation of",
            style: &["gentle continuous movement", "cohesive color palette"],
        },
    }
}

/// Build the final prompt sent to the image or video model
pub fn apply_template(kind: AssetKind, prompt: &str) -> String {
    let template = template_for(kind);
    let mut parts = Vec::with_capacity(template.style.len() + 2);

    parts.push(format!("{} {}", template.prefix, prompt.trim()));
    parts.extend(template.style.iter().map(|s| s.to_string()));

    if kind.is_motion() {
        parts.push(LOOP_CLAUSE.to_string());
    } else if kind.strips_background() {
        parts.push(ISOLATION_CLAUSE.to_string());
    }

    parts.join(", ")
}
