//! Asset kinds and the values that flow through a generation run

use atelier_core::{AssetId, AtelierError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound on variations in one request
pub const MAX_VARIATIONS: usize = 100;

/// The kind of asset to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    /// Die-cut sticker
    Sticker,
    /// Flat isolated object
    FlatGraphic,
    /// Volumetric render
    #[serde(rename = "3d-render")]
    Render3d,
    Mockup,
    Photo,
    /// Postage-stamp design
    Stamp,
    /// Minimal vector rubber-stamp illustration
    StampStyle,
    /// Seamlessly looping video
    Animation,
}

impl AssetKind {
    pub const ALL: [AssetKind; 8] = [
        AssetKind::Sticker,
        AssetKind::FlatGraphic,
        AssetKind::Render3d,
        AssetKind::Mockup,
        AssetKind::Photo,
        AssetKind::Stamp,
        AssetKind::StampStyle,
        AssetKind::Animation,
    ];

    /// Wire name, as accepted by `FromStr` and the HTTP surface
    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Sticker => "sticker",
            AssetKind::FlatGraphic => "flat-graphic",
            AssetKind::Render3d => "3d-render",
            AssetKind::Mockup => "mockup",
            AssetKind::Photo => "photo",
            AssetKind::Stamp => "stamp",
            AssetKind::StampStyle => "stamp-style",
            AssetKind::Animation => "animation",
        }
    }

    /// Motion kinds are produced by the video job path
    pub fn is_motion(self) -> bool {
        matches!(self, AssetKind::Animation)
    }

    /// Kinds meant for isolated-object use get their white background keyed out
    pub fn strips_background(self) -> bool {
        matches!(
            self,
            AssetKind::Sticker
                | AssetKind::FlatGraphic
                | AssetKind::StampStyle
                | AssetKind::Render3d
                | AssetKind::Stamp
        )
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = AtelierError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        AssetKind::ALL
            .into_iter()
            .find(|k| k.as_str() == needle)
            .ok_or_else(|| {
                let names: Vec<&str> = AssetKind::ALL.iter().map(|k| k.as_str()).collect();
                AtelierError::ValidationError(format!(
                    "Unknown asset kind '{}'. Use: {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// One generation request: a theme, a kind, and how many assets to produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationRequest {
    pub base_prompt: String,
    pub kind: AssetKind,
    pub count: usize,
}

impl VariationRequest {
    pub fn new(base_prompt: &str, kind: AssetKind, count: usize) -> Result<Self> {
        let base_prompt = base_prompt.trim();
        if base_prompt.is_empty() {
            return Err(AtelierError::ValidationError(
                "Prompt must not be empty".to_string(),
            ));
        }
        validate_count(count)?;
        Ok(Self {
            base_prompt: base_prompt.to_string(),
            kind,
            count,
        })
    }
}

/// Check that `count` is within `1..=MAX_VARIATIONS`
pub fn validate_count(count: usize) -> Result<()> {
    if !(1..=MAX_VARIATIONS).contains(&count) {
        return Err(AtelierError::ValidationError(format!(
            "Variation count must be between 1 and {}, got {}",
            MAX_VARIATIONS, count
        )));
    }
    Ok(())
}

/// Raw bytes of a generated image or video
#[derive(Clone, PartialEq, Eq)]
pub struct AssetContent {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl AssetContent {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Render as a `data:` URI for inline display
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }
}

impl fmt::Debug for AssetContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetContent")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A successfully generated asset. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct GeneratedAsset {
    pub id: AssetId,
    pub content: AssetContent,
    pub kind: AssetKind,
    pub source_prompt: String,
    pub created_at: DateTime<Utc>,
    pub is_motion: bool,
}

impl GeneratedAsset {
    pub fn new(content: AssetContent, kind: AssetKind, source_prompt: &str) -> Self {
        Self {
            id: AssetId::new(),
            content,
            kind,
            source_prompt: source_prompt.to_string(),
            created_at: Utc::now(),
            is_motion: kind.is_motion(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_and_display() {
        for kind in AssetKind::ALL {
            assert_eq!(kind.as_str().parse::<AssetKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.as_str());
        }
        assert_eq!(" Sticker ".parse::<AssetKind>().unwrap(), AssetKind::Sticker);
    }

    #[test]
    fn test_kind_parse_unknown_lists_names() {
        let err = "hologram".parse::<AssetKind>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("hologram"));
        assert!(msg.contains("3d-render"));
    }

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&AssetKind::Render3d).unwrap();
        assert_eq!(json, "\"3d-render\"");
        let kind: AssetKind = serde_json::from_str("\"flat-graphic\"").unwrap();
        assert_eq!(kind, AssetKind::FlatGraphic);
    }

    #[test]
    fn test_background_and_motion_flags() {
        let stripped: Vec<AssetKind> = AssetKind::ALL
            .into_iter()
            .filter(|k| k.strips_background())
            .collect();
        assert_eq!(stripped.len(), 5);
        assert!(!AssetKind::Photo.strips_background());
        assert!(!AssetKind::Mockup.strips_background());
        assert!(!AssetKind::Animation.strips_background());
        assert!(AssetKind::Animation.is_motion());
        assert!(!AssetKind::Sticker.is_motion());
    }

    #[test]
    fn test_variation_request_validation() {
        let req = VariationRequest::new("  red balloon ", AssetKind::Sticker, 20).unwrap();
        assert_eq!(req.base_prompt, "red balloon");
        assert!(VariationRequest::new("   ", AssetKind::Sticker, 20).is_err());
        assert!(VariationRequest::new("cat", AssetKind::Sticker, 0).is_err());
        assert!(VariationRequest::new("cat", AssetKind::Sticker, MAX_VARIATIONS).is_ok());
        assert!(matches!(
            VariationRequest::new("cat", AssetKind::Sticker, MAX_VARIATIONS + 1),
            Err(AtelierError::ValidationError(_))
        ));
    }

    #[test]
    fn test_data_uri() {
        let content = AssetContent::new(b"abc".to_vec(), "image/png");
        assert_eq!(content.to_data_uri(), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_generated_asset_motion_flag() {
        let asset = GeneratedAsset::new(
            AssetContent::new(vec![1, 2, 3], "video/mp4"),
            AssetKind::Animation,
            "spinning top",
        );
        assert!(asset.is_motion);
        assert_eq!(asset.source_prompt, "spinning top");
    }
}
