//! Writing generated assets to disk
//!
//! Each asset becomes one media file plus a `.asset.toml` sidecar describing
//! where it came from.

use crate::asset::GeneratedAsset;
use atelier_core::{AtelierError, ContentHash, Result};
use image::ImageFormat;
use serde::Serialize;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Image format for exported static assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Webp => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Webp => "image/webp",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            ExportFormat::Png => ImageFormat::Png,
            ExportFormat::Jpeg => ImageFormat::Jpeg,
            ExportFormat::Webp => ImageFormat::WebP,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = AtelierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpeg),
            "webp" => Ok(ExportFormat::Webp),
            other => Err(AtelierError::ValidationError(format!(
                "Unknown export format '{}'. Use png, jpeg, or webp",
                other
            ))),
        }
    }
}

/// Files written for one asset
#[derive(Debug, Clone)]
pub struct ExportedAsset {
    pub path: PathBuf,
    pub sidecar_path: PathBuf,
    pub hash: String,
}

#[derive(Serialize)]
struct Sidecar<'a> {
    asset: SidecarAsset<'a>,
}

#[derive(Serialize)]
struct SidecarAsset<'a> {
    id: &'a str,
    kind: &'a str,
    source_prompt: &'a str,
    created_at: String,
    mime_type: &'a str,
    hash: String,
}

/// Export one asset into `dir` as `<index>_<kind>_<hash>.<ext>`.
///
/// Motion assets keep their original video bytes whatever `format` says.
pub fn export_asset(
    asset: &GeneratedAsset,
    index: usize,
    format: ExportFormat,
    dir: &Path,
) -> Result<ExportedAsset> {
    std::fs::create_dir_all(dir)?;

    let (bytes, extension, mime_type) = if asset.is_motion {
        (asset.content.bytes.clone(), "mp4", asset.content.mime_type.as_str())
    } else {
        (
            encode_image(&asset.content.bytes, format)?,
            format.extension(),
            format.mime_type(),
        )
    };

    let hash = ContentHash::of(&bytes);
    let stem = format!("{:02}_{}_{}", index, asset.kind, hash.short());
    let path = dir.join(format!("{}.{}", stem, extension));
    std::fs::write(&path, &bytes)?;

    let sidecar = Sidecar {
        asset: SidecarAsset {
            id: asset.id.as_str(),
            kind: asset.kind.as_str(),
            source_prompt: &asset.source_prompt,
            created_at: asset.created_at.to_rfc3339(),
            mime_type,
            hash: hash.to_prefixed_hex(),
        },
    };
    let sidecar_path = dir.join(format!("{}.asset.toml", stem));
    std::fs::write(&sidecar_path, toml::to_string_pretty(&sidecar)?)?;

    tracing::debug!(path = %path.display(), "asset exported");
    Ok(ExportedAsset {
        path,
        sidecar_path,
        hash: hash.to_prefixed_hex(),
    })
}

/// Export a whole run in order, numbering from 1
pub fn export_run(
    assets: &[GeneratedAsset],
    format: ExportFormat,
    dir: &Path,
) -> Result<Vec<ExportedAsset>> {
    assets
        .iter()
        .enumerate()
        .map(|(i, asset)| export_asset(asset, i + 1, format, dir))
        .collect()
}

fn encode_image(bytes: &[u8], format: ExportFormat) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| AtelierError::ExportError(format!("Cannot decode asset image: {}", e)))?;

    let mut out = Vec::new();
    let mut cursor = Cursor::new(&mut out);
    let encoded = match format {
        // No alpha channel in JPEG
        ExportFormat::Jpeg => img.to_rgb8().write_to(&mut cursor, format.image_format()),
        _ => img.to_rgba8().write_to(&mut cursor, format.image_format()),
    };
    encoded.map_err(|e| {
        AtelierError::ExportError(format!("Failed to encode {}: {}", format.extension(), e))
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetContent, AssetKind};
    use image::{Rgba, RgbaImage};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("atelier_export_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn png_asset(kind: AssetKind) -> GeneratedAsset {
        let img = RgbaImage::from_fn(4, 4, |x, _| {
            if x < 2 {
                Rgba([10, 20, 30, 255])
            } else {
                Rgba([255, 255, 255, 0])
            }
        });
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        GeneratedAsset::new(AssetContent::new(bytes, "image/png"), kind, "blue kite")
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("PNG".parse::<ExportFormat>().unwrap(), ExportFormat::Png);
        assert_eq!("jpg".parse::<ExportFormat>().unwrap(), ExportFormat::Jpeg);
        assert_eq!("webp".parse::<ExportFormat>().unwrap(), ExportFormat::Webp);
        assert!("gif".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_export_png_with_sidecar() {
        let dir = temp_dir();
        let asset = png_asset(AssetKind::Sticker);

        let exported = export_asset(&asset, 3, ExportFormat::Png, &dir).unwrap();
        let name = exported.path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("03_sticker_"));
        assert!(name.ends_with(".png"));

        let img = image::open(&exported.path).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(3, 0).0[3], 0);

        let sidecar: toml::Value =
            toml::from_str(&std::fs::read_to_string(&exported.sidecar_path).unwrap()).unwrap();
        let table = sidecar.get("asset").unwrap();
        assert_eq!(table.get("kind").unwrap().as_str(), Some("sticker"));
        assert_eq!(table.get("source_prompt").unwrap().as_str(), Some("blue kite"));
        assert_eq!(table.get("id").unwrap().as_str(), Some(asset.id.as_str()));
        assert_eq!(
            table.get("hash").unwrap().as_str(),
            Some(exported.hash.as_str())
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_export_jpeg_and_webp() {
        let dir = temp_dir();
        let asset = png_asset(AssetKind::Photo);

        let jpeg = export_asset(&asset, 1, ExportFormat::Jpeg, &dir).unwrap();
        assert_eq!(jpeg.path.extension().unwrap(), "jpg");
        assert_eq!(
            image::ImageFormat::from_path(&jpeg.path).unwrap(),
            ImageFormat::Jpeg
        );
        assert!(image::open(&jpeg.path).is_ok());

        let webp = export_asset(&asset, 2, ExportFormat::Webp, &dir).unwrap();
        assert_eq!(webp.path.extension().unwrap(), "webp");
        assert!(image::open(&webp.path).is_ok());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_export_motion_keeps_video_bytes() {
        let dir = temp_dir();
        let bytes = b"\x00\x00\x00\x18ftypisom".to_vec();
        let asset = GeneratedAsset::new(
            AssetContent::new(bytes.clone(), "video/mp4"),
            AssetKind::Animation,
            "spinning coin",
        );

        let exported = export_asset(&asset, 1, ExportFormat::Png, &dir).unwrap();
        assert_eq!(exported.path.extension().unwrap(), "mp4");
        assert_eq!(std::fs::read(&exported.path).unwrap(), bytes);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_export_run_numbers_in_order() {
        let dir = temp_dir();
        let assets = vec![png_asset(AssetKind::Stamp), png_asset(AssetKind::Stamp)];
        let exported = export_run(&assets, ExportFormat::Png, &dir).unwrap();
        assert_eq!(exported.len(), 2);
        assert!(exported[0]
            .path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("01_"));
        assert!(exported[1]
            .path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("02_"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_undecodable_static_asset_is_export_error() {
        let dir = temp_dir();
        let asset = GeneratedAsset::new(
            AssetContent::new(b"not an image".to_vec(), "image/png"),
            AssetKind::Photo,
            "x",
        );
        assert!(matches!(
            export_asset(&asset, 1, ExportFormat::Png, &dir),
            Err(AtelierError::ExportError(_))
        ));
        std::fs::remove_dir_all(&dir).ok();
    }
}
