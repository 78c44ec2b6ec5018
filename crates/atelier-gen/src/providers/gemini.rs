//! Gemini generation provider (Google Generative Language API)
//!
//! Text variations and static images are single `generateContent` calls.
//! Videos go through a long-running `predictLongRunning` operation that the
//! fetcher polls. Failures are classified here, from the HTTP status and the
//! structured `error.status` field of the response body.

use crate::asset::AssetContent;
use crate::config::AtelierConfig;
use crate::provider::*;
use atelier_core::{AtelierError, Result, ServiceErrorKind};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
const DEFAULT_VIDEO_MODEL: &str = "veo-3.0-fast-generate-001";
const VIDEO_ASPECT_RATIO: &str = "16:9";
const REQUEST_TIMEOUT_SECS: u64 = 120;
const MAX_JSON_BYTES: u64 = 64 * 1024 * 1024;
const MAX_VIDEO_BYTES: u64 = 512 * 1024 * 1024;

/// Gemini provider for text, image, and video generation
pub struct GeminiService {
    api_key: String,
    api_url: String,
    text_model: String,
    image_model: String,
    video_model: String,
}

impl GeminiService {
    /// Create a new GeminiService from config
    pub fn from_config(config: &AtelierConfig) -> Result<Self> {
        let api_key = config
            .api_key("gemini")
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AtelierError::ConfigError(
                    "Gemini API key not configured. Set ATELIER_GEMINI_API_KEY or add to .atelier/config.toml".to_string(),
                )
            })?
            .to_string();

        let section = config.provider("gemini").cloned().unwrap_or_default();

        Ok(Self {
            api_key,
            api_url: config
                .api_url("gemini")
                .unwrap_or(DEFAULT_GEMINI_URL)
                .trim_end_matches('/')
                .to_string(),
            text_model: section
                .text_model
                .unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            image_model: section
                .image_model
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            video_model: section
                .video_model
                .unwrap_or_else(|| DEFAULT_VIDEO_MODEL.to_string()),
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.api_url, model, method)
    }

    fn post_json(&self, url: &str, payload: &Value) -> Result<Value> {
        tracing::debug!(url, "POST");
        let mut response = build_agent()
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .send_json(payload)
            .map_err(transport_error)?;

        ensure_success(&mut response)?;
        read_json(&mut response)
    }

    fn get_json(&self, url: &str) -> Result<Value> {
        tracing::debug!(url, "GET");
        let mut response = build_agent()
            .get(url)
            .header("x-goog-api-key", &self.api_key)
            .call()
            .map_err(transport_error)?;

        ensure_success(&mut response)?;
        read_json(&mut response)
    }
}

fn build_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .http_status_as_error(false)
        .build();
    config.into()
}

/// Transport-level failures never reached the service; only some are worth
/// retrying
fn transport_error(e: ureq::Error) -> AtelierError {
    let kind = match e {
        ureq::Error::Timeout(_)
        | ureq::Error::Io(_)
        | ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound => ServiceErrorKind::TransientUpstream,
        ureq::Error::StatusCode(code) => ServiceErrorKind::from_http(code, None),
        _ => ServiceErrorKind::Unknown,
    };
    AtelierError::service(kind, format!("Gemini request failed: {}", e))
}

fn ensure_success(response: &mut ureq::http::Response<ureq::Body>) -> Result<()> {
    let code = response.status().as_u16();
    if (200..300).contains(&code) {
        return Ok(());
    }

    let body = response.body_mut().read_to_string().unwrap_or_default();
    let err = classify_error_body(code, &body);
    tracing::debug!(code, error = %err, "Gemini returned an error status");
    Err(err)
}

fn read_json(response: &mut ureq::http::Response<ureq::Body>) -> Result<Value> {
    let bytes = response
        .body_mut()
        .with_config()
        .limit(MAX_JSON_BYTES)
        .read_to_vec()
        .map_err(|e| {
            AtelierError::service(
                ServiceErrorKind::TransientUpstream,
                format!("Failed to read Gemini response: {}", e),
            )
        })?;

    serde_json::from_slice(&bytes).map_err(|e| {
        AtelierError::service(
            ServiceErrorKind::Unknown,
            format!("Gemini response is not JSON: {}", e),
        )
    })
}

/// Classify a non-2xx response from its status code and error body
pub fn classify_error_body(code: u16, body: &str) -> AtelierError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let status = error.and_then(|e| e.get("status")).and_then(Value::as_str);
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.chars().take(200).collect());

    AtelierError::service(
        ServiceErrorKind::from_http(code, status),
        format!("HTTP {}: {}", code, message),
    )
}

/// Concatenate the text parts of the first candidate
pub fn parse_text_response(response: &Value) -> String {
    first_candidate_parts(response)
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("")
}

/// Decode every inline image part of the first candidate, in order
pub fn parse_inline_images(response: &Value) -> Result<Vec<AssetContent>> {
    let mut images = Vec::new();
    for part in first_candidate_parts(response) {
        let Some(inline) = part.get("inlineData").or_else(|| part.get("inline_data")) else {
            continue;
        };
        let data = inline.get("data").and_then(Value::as_str).unwrap_or_default();
        if data.is_empty() {
            continue;
        }
        let bytes = BASE64.decode(data.as_bytes()).map_err(|e| {
            AtelierError::NoOutputProduced(format!("Gemini image payload is not valid base64: {}", e))
        })?;
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .unwrap_or("image/png");
        images.push(AssetContent::new(bytes, mime_type));
    }
    Ok(images)
}

/// Interpret a long-running operation snapshot
pub fn parse_operation(response: &Value) -> JobPollResult {
    if !response.get("done").and_then(Value::as_bool).unwrap_or(false) {
        return JobPollResult::Processing;
    }

    if let Some(error) = response.get("error") {
        let msg = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error")
            .to_string();
        return JobPollResult::Failed(msg);
    }

    let download_url = response
        .pointer("/response/generateVideoResponse/generatedSamples/0/video/uri")
        .and_then(Value::as_str)
        .map(str::to_string);
    JobPollResult::Complete { download_url }
}

fn first_candidate_parts(response: &Value) -> Vec<Value> {
    response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

impl GenerationService for GeminiService {
    fn name(&self) -> &str {
        "gemini"
    }

    fn health_check(&self) -> ProviderStatus {
        if self.api_key.is_empty() {
            ProviderStatus::NoApiKey
        } else {
            ProviderStatus::Available
        }
    }

    fn generate_string_list(&self, instruction: &str) -> Result<String> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": instruction }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" }
                }
            }
        });

        let response = self.post_json(&self.model_url(&self.text_model, "generateContent"), &payload)?;
        Ok(parse_text_response(&response))
    }

    fn generate_images(&self, prompt: &str, aspect_ratio: &str) -> Result<Vec<AssetContent>> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": { "aspectRatio": aspect_ratio }
            }
        });

        let response = self.post_json(&self.model_url(&self.image_model, "generateContent"), &payload)?;
        parse_inline_images(&response)
    }

    fn submit_video(&self, prompt: &str) -> Result<VideoJob> {
        let payload = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "aspectRatio": VIDEO_ASPECT_RATIO }
        });

        let response =
            self.post_json(&self.model_url(&self.video_model, "predictLongRunning"), &payload)?;

        let remote_id = response
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AtelierError::NoOutputProduced(format!(
                    "Unexpected Gemini video submit response: {}",
                    serde_json::to_string_pretty(&response).unwrap_or_default()
                ))
            })?
            .to_string();

        Ok(VideoJob {
            remote_id,
            prompt: prompt.to_string(),
        })
    }

    fn poll_video(&self, job: &VideoJob) -> Result<JobPollResult> {
        let url = format!("{}/{}", self.api_url, job.remote_id);
        let response = self.get_json(&url)?;
        Ok(parse_operation(&response))
    }

    fn download_video(&self, download_url: &str) -> Result<AssetContent> {
        let mut response = build_agent()
            .get(download_url)
            .header("x-goog-api-key", &self.api_key)
            .call()
            .map_err(transport_error)?;
        ensure_success(&mut response)?;

        let mime_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("video/"))
            .unwrap_or("video/mp4")
            .to_string();

        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_VIDEO_BYTES)
            .read_to_vec()
            .map_err(|e| {
                AtelierError::service(
                    ServiceErrorKind::TransientUpstream,
                    format!("Failed to read video data: {}", e),
                )
            })?;

        Ok(AssetContent::new(bytes, mime_type))
    }
}
