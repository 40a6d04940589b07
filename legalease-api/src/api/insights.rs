//! Analytics, export and comparison endpoints

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use legalease_common::models::AnalyticsData;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::auth::CurrentUser;
use super::documents::owned_document;
use crate::analytics;
use crate::compare;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::export::{self, ExportFormat};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsParams {
    pub days: Option<u32>,
}

/// GET /api/analytics
pub async fn get_analytics(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<AnalyticsParams>,
) -> ApiResult<Json<AnalyticsData>> {
    let documents = db::completed_with_analysis(&state.db, user.id).await?;
    let days = analytics::trend_days(params.days);
    debug!(user_id = %user.id, documents = documents.len(), days, "Computing analytics");
    Ok(Json(analytics::compute(
        &documents,
        Utc::now().date_naive(),
        days,
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub document_id: Option<String>,
    pub format: Option<String>,
}

/// POST /api/export
pub async fn export_analysis(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ExportRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(document_id), Some(format)) = (
        req.document_id.filter(|v| !v.trim().is_empty()),
        req.format.filter(|v| !v.trim().is_empty()),
    ) else {
        return Err(ApiError::BadRequest("Missing documentId or format".to_string()));
    };
    let format = ExportFormat::parse(&format)
        .ok_or_else(|| ApiError::BadRequest("Unsupported format".to_string()))?;

    let mut document = owned_document(&state, user.id, &document_id).await?;
    let analysis = document
        .analysis_result
        .take()
        .ok_or_else(|| ApiError::NotFound("Analysis not found".to_string()))?;

    let file = export::render(&document, &analysis, format)
        .map_err(|e| ApiError::Internal(format!("Export serialization failed: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, file.disposition()),
        ],
        file.body,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    #[serde(default)]
    pub document_ids: Vec<String>,
}

/// POST /api/compare
pub async fn compare_documents(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CompareRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if req.document_ids.len() < 2 {
        return Err(ApiError::BadRequest(
            "Need at least 2 documents to compare".to_string(),
        ));
    }

    let mut documents = Vec::with_capacity(req.document_ids.len());
    for id in &req.document_ids {
        let mut document = owned_document(&state, user.id, id)
            .await
            .map_err(|e| match e {
                ApiError::NotFound(_) => ApiError::NotFound(format!("Document {} not found", id)),
                other => other,
            })?;
        let analysis = document.analysis_result.take();
        documents.push((document, analysis));
    }

    Ok(Json(json!({ "comparison": compare::compare(&documents) })))
}

pub fn insight_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analytics", get(get_analytics))
        .route("/api/export", post(export_analysis))
        .route("/api/compare", post(compare_documents))
}
