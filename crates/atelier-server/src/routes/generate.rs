//! POST /generate: fetch a single asset and return it inline

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use atelier_gen::{AssetFetcher, AssetKind};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub prompt: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    /// `data:` URI of the generated asset
    pub image: String,
}

async fn generate(
    State(state): State<AppState>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> ApiResult<Json<GenerateResponse>> {
    let Json(body) = body?;

    let prompt = body
        .prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Prompt is required".to_string()))?;
    let kind: AssetKind = body
        .kind
        .ok_or_else(|| ApiError::BadRequest("Type is required".to_string()))?
        .parse()?;

    let content = tokio::task::spawn_blocking(move || {
        AssetFetcher::new(
            state.service.as_ref(),
            state.credentials.as_ref(),
            state.sleeper.as_ref(),
        )
        .with_retry_policy(state.settings.retry)
        .with_poll_policy(state.settings.poll)
        .fetch(&prompt, kind)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Generation task failed: {e}")))??;

    Ok(Json(GenerateResponse {
        image: content.to_data_uri(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/generate", post(generate))
}
