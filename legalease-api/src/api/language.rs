//! Translation, clause explanation, speech and legal-content detection

use axum::{extract::State, routing::post, Json, Router};
use legalease_common::models::ClauseExplanation;
use serde::Deserialize;
use serde_json::json;

use super::auth::CurrentUser;
use crate::detect::{self, DetectionResult};
use crate::error::{ApiError, ApiResult};
use crate::tts::{self, Speech};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: Option<String>,
    pub target_language: Option<String>,
}

/// POST /api/translate
pub async fn translate(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Json(req): Json<TranslateRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let (Some(text), Some(language)) = (
        req.text.filter(|t| !t.trim().is_empty()),
        req.target_language.filter(|l| !l.trim().is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Missing text or target language".to_string(),
        ));
    };

    let translated = state
        .pipeline
        .analyst()
        .translate(&text, language.trim())
        .await?;
    Ok(Json(json!({ "translatedText": translated })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainRequest {
    pub clause_text: Option<String>,
}

/// POST /api/explain
pub async fn explain(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Json(req): Json<ExplainRequest>,
) -> ApiResult<Json<ClauseExplanation>> {
    let clause = req
        .clause_text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing clause text".to_string()))?;

    let explanation = state.pipeline.analyst().explain_clause(&clause).await?;
    Ok(Json(explanation))
}

#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    pub text: Option<String>,
    pub language: Option<String>,
    pub rate: Option<f32>,
}

/// POST /api/tts
pub async fn text_to_speech(
    CurrentUser(_user): CurrentUser,
    Json(req): Json<SpeechRequest>,
) -> ApiResult<Json<Speech>> {
    let text = req
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("No text provided".to_string()))?;
    let language = req
        .language
        .unwrap_or_else(|| tts::DEFAULT_LANGUAGE.to_string());
    let rate = tts::effective_rate(req.rate);

    let speech = tokio::task::spawn_blocking(move || tts::synthesize(&text, &language, rate))
        .await
        .map_err(|e| ApiError::Internal(format!("Speech task failed: {}", e)))??;
    Ok(Json(speech))
}

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    #[serde(default)]
    pub text: String,
}

/// POST /api/detect
///
/// Unauthenticated; the extension calls it on arbitrary pages before the
/// user has signed in.
pub async fn detect_legal_content(Json(req): Json<DetectRequest>) -> Json<DetectionResult> {
    Json(detect::detect(&req.text))
}

pub fn language_routes() -> Router<AppState> {
    Router::new()
        .route("/api/translate", post(translate))
        .route("/api/explain", post(explain))
        .route("/api/tts", post(text_to_speech))
        .route("/api/detect", post(detect_legal_content))
}
