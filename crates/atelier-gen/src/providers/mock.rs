//! Mock service for testing and offline use
//!
//! Produces variation lists, placeholder PNGs (a colored square on a white
//! background) and a stub MP4 without any network calls. Failures can be
//! scripted per call so pipeline behavior can be exercised deterministically.

use crate::asset::AssetContent;
use crate::provider::*;
use atelier_core::{AtelierError, Result, ServiceErrorKind};
use image::{ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

const IMAGE_SIZE: u32 = 32;
const SQUARE_SIZE: u32 = 16;
const ANGLES: [&str; 4] = ["front view", "three-quarter view", "side profile", "top-down view"];
const PALETTES: [&str; 5] = [
    "warm palette",
    "cool palette",
    "pastel palette",
    "monochrome palette",
    "neon palette",
];

/// Calls observed so far
#[derive(Debug, Default)]
struct MockLog {
    text_calls: usize,
    image_prompts: Vec<String>,
    video_prompts: Vec<String>,
    poll_calls: usize,
    polls_per_job: HashMap<String, u32>,
}

/// A scriptable in-process generation service
#[derive(Debug, Default)]
pub struct MockService {
    variations_payload: Option<String>,
    text_failures: Option<(ServiceErrorKind, usize)>,
    image_failures: HashMap<usize, ServiceErrorKind>,
    image_failures_from: Option<(usize, ServiceErrorKind)>,
    empty_images: bool,
    polls_before_done: u32,
    video_failure: Option<String>,
    log: Mutex<MockLog>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return this exact text from the variations call
    pub fn with_variations_payload(mut self, payload: &str) -> Self {
        self.variations_payload = Some(payload.to_string());
        self
    }

    /// Fail the first `times` variations calls with `kind`
    pub fn fail_text_times(mut self, kind: ServiceErrorKind, times: usize) -> Self {
        self.text_failures = Some((kind, times));
        self
    }

    /// Fail the image call with this 0-based index
    pub fn fail_image_call(mut self, index: usize, kind: ServiceErrorKind) -> Self {
        self.image_failures.insert(index, kind);
        self
    }

    /// Fail every image call from this 0-based index on
    pub fn fail_image_calls_from(mut self, index: usize, kind: ServiceErrorKind) -> Self {
        self.image_failures_from = Some((index, kind));
        self
    }

    /// Answer image calls with no inline payload
    pub fn with_empty_image_responses(mut self) -> Self {
        self.empty_images = true;
        self
    }

    /// Report "processing" this many times before a video job completes
    pub fn with_video_polls_before_done(mut self, polls: u32) -> Self {
        self.polls_before_done = polls;
        self
    }

    /// Make every video job end in failure
    pub fn with_failed_video_jobs(mut self, message: &str) -> Self {
        self.video_failure = Some(message.to_string());
        self
    }

    pub fn text_calls(&self) -> usize {
        self.with_log(|log| log.text_calls)
    }

    pub fn image_calls(&self) -> usize {
        self.with_log(|log| log.image_prompts.len())
    }

    /// Every prompt sent to the image endpoint, in order
    pub fn image_prompts(&self) -> Vec<String> {
        self.with_log(|log| log.image_prompts.clone())
    }

    pub fn video_prompts(&self) -> Vec<String> {
        self.with_log(|log| log.video_prompts.clone())
    }

    pub fn poll_calls(&self) -> usize {
        self.with_log(|log| log.poll_calls)
    }

    fn with_log<T: Default>(&self, f: impl FnOnce(&mut MockLog) -> T) -> T {
        match self.log.lock() {
            Ok(mut log) => f(&mut log),
            Err(_) => T::default(),
        }
    }

    fn scripted_image_failure(&self, index: usize) -> Option<ServiceErrorKind> {
        if let Some(kind) = self.image_failures.get(&index) {
            return Some(*kind);
        }
        match self.image_failures_from {
            Some((from, kind)) if index >= from => Some(kind),
            _ => None,
        }
    }
}

impl GenerationService for MockService {
    fn name(&self) -> &str {
        "mock"
    }

    fn health_check(&self) -> ProviderStatus {
        ProviderStatus::Available
    }

    fn generate_string_list(&self, instruction: &str) -> Result<String> {
        let call = self.with_log(|log| {
            log.text_calls += 1;
            log.text_calls
        });

        if let Some((kind, times)) = self.text_failures {
            if call <= times {
                return Err(AtelierError::service(kind, format!("mock text failure #{}", call)));
            }
        }

        if let Some(ref payload) = self.variations_payload {
            return Ok(payload.clone());
        }

        let (theme, count) = parse_instruction(instruction);
        let variations: Vec<String> = (0..count)
            .map(|i| {
                format!(
                    "{}, {}, {}, detail level {}",
                    theme,
                    ANGLES[i % ANGLES.len()],
                    PALETTES[i % PALETTES.len()],
                    i + 1
                )
            })
            .collect();

        serde_json::to_string(&variations).map_err(|e| {
            AtelierError::service(ServiceErrorKind::Unknown, format!("mock encode failed: {}", e))
        })
    }

    fn generate_images(&self, prompt: &str, _aspect_ratio: &str) -> Result<Vec<AssetContent>> {
        let index = self.with_log(|log| {
            log.image_prompts.push(prompt.to_string());
            log.image_prompts.len() - 1
        });

        if let Some(kind) = self.scripted_image_failure(index) {
            return Err(AtelierError::service(
                kind,
                format!("mock image failure on call {}", index),
            ));
        }
        if self.empty_images {
            return Ok(Vec::new());
        }

        Ok(vec![placeholder_png(prompt)?])
    }

    fn submit_video(&self, prompt: &str) -> Result<VideoJob> {
        let index = self.with_log(|log| {
            log.video_prompts.push(prompt.to_string());
            log.video_prompts.len()
        });
        Ok(VideoJob {
            remote_id: format!("operations/mock-{}", index),
            prompt: prompt.to_string(),
        })
    }

    fn poll_video(&self, job: &VideoJob) -> Result<JobPollResult> {
        let polls = self.with_log(|log| {
            log.poll_calls += 1;
            let count = log.polls_per_job.entry(job.remote_id.clone()).or_insert(0);
            *count += 1;
            *count
        });

        if let Some(ref msg) = self.video_failure {
            return Ok(JobPollResult::Failed(msg.clone()));
        }
        if polls <= self.polls_before_done {
            return Ok(JobPollResult::Processing);
        }
        Ok(JobPollResult::Complete {
            download_url: Some(format!("mock://{}", job.remote_id)),
        })
    }

    fn download_video(&self, download_url: &str) -> Result<AssetContent> {
        // Smallest recognizable MP4: a single `ftyp` box
        let mut bytes = Vec::with_capacity(24);
        bytes.extend_from_slice(&24u32.to_be_bytes());
        bytes.extend_from_slice(b"ftypisom");
        bytes.extend_from_slice(&0x200u32.to_be_bytes());
        bytes.extend_from_slice(b"isommp41");
        tracing::debug!(url = download_url, "mock video downloaded");
        Ok(AssetContent::new(bytes, "video/mp4"))
    }
}

/// Pull the theme and count back out of a variation instruction
fn parse_instruction(instruction: &str) -> (String, usize) {
    let theme = instruction
        .split_once("theme: \"")
        .and_then(|(_, rest)| rest.split_once('"'))
        .map(|(theme, _)| theme.to_string())
        .unwrap_or_else(|| "asset".to_string());

    let count = instruction
        .split_once("exactly ")
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(10);

    (theme, count)
}

/// A white PNG with a colored square in the middle; color derived from the prompt
fn placeholder_png(prompt: &str) -> Result<AssetContent> {
    let hash_val = prompt
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    // Keep every channel well clear of the white-keying threshold
    let r = ((hash_val >> 16) & 0xFF) as u8 % 200;
    let g = ((hash_val >> 8) & 0xFF) as u8 % 200;
    let b = (hash_val & 0xFF) as u8 % 200;

    let offset = (IMAGE_SIZE - SQUARE_SIZE) / 2;
    let img = RgbaImage::from_fn(IMAGE_SIZE, IMAGE_SIZE, |x, y| {
        let inside = (offset..offset + SQUARE_SIZE).contains(&x)
            && (offset..offset + SQUARE_SIZE).contains(&y);
        if inside {
            Rgba([r, g, b, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });

    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| AtelierError::ImageError(format!("Failed to encode PNG: {}", e)))?;
    Ok(AssetContent::new(bytes, "image/png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetKind;
    use crate::variations::{parse_variations, variation_instruction};

    #[test]
    fn test_mock_variations_follow_instruction() {
        let service = MockService::new();
        let instruction = variation_instruction("red balloon", AssetKind::Sticker, 7);
        let payload = service.generate_string_list(&instruction).unwrap();
        let variations = parse_variations(&payload).unwrap();

        assert_eq!(variations.len(), 7);
        assert!(variations.iter().all(|v| v.starts_with("red balloon")));
        let mut unique = variations.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 7);
    }

    #[test]
    fn test_mock_image_is_decodable_png() {
        let service = MockService::new();
        let images = service.generate_images("a cat", "1:1").unwrap();
        assert_eq!(images.len(), 1);
        let img = image::load_from_memory(&images[0].bytes).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (IMAGE_SIZE, IMAGE_SIZE));
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
        let center = img.get_pixel(IMAGE_SIZE / 2, IMAGE_SIZE / 2).0;
        assert!(center[0] < 200 && center[1] < 200 && center[2] < 200);
    }

    #[test]
    fn test_scripted_image_failures() {
        let service = MockService::new()
            .fail_image_call(1, ServiceErrorKind::Unknown)
            .fail_image_calls_from(3, ServiceErrorKind::RateLimited);

        assert!(service.generate_images("a", "1:1").is_ok());
        let err = service.generate_images("b", "1:1").unwrap_err();
        assert_eq!(err.service_kind(), Some(ServiceErrorKind::Unknown));
        assert!(service.generate_images("c", "1:1").is_ok());
        assert!(service.generate_images("d", "1:1").unwrap_err().is_rate_limited());
        assert!(service.generate_images("e", "1:1").unwrap_err().is_rate_limited());
        assert_eq!(service.image_calls(), 5);
    }

    #[test]
    fn test_video_job_lifecycle() {
        let service = MockService::new().with_video_polls_before_done(1);
        let job = service.submit_video("loop").unwrap();
        assert_eq!(service.poll_video(&job).unwrap(), JobPollResult::Processing);
        let done = service.poll_video(&job).unwrap();
        let JobPollResult::Complete {
            download_url: Some(url),
        } = done
        else {
            panic!("expected completed job, got {:?}", done);
        };
        let video = service.download_video(&url).unwrap();
        assert_eq!(video.mime_type, "video/mp4");
        assert_eq!(&video.bytes[4..8], b"ftyp");
    }
}
