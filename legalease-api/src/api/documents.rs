//! Document library endpoints
//!
//! Upload returns 202 as soon as the document is stored; the analysis runs on
//! the pipeline and clients poll `GET /api/documents/:id` (or listen on
//! `/api/events`) until the status is `completed` or `error`.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use legalease_common::events::LegalEaseEvent;
use legalease_common::models::{AnalysisStatus, Document, DocumentAnalysis, DocumentSummary};
use legalease_common::time;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::auth::CurrentUser;
use crate::db::{self, DocumentQuery};
use crate::error::{ApiError, ApiResult};
use crate::extract::{extract_text, ExtractError};
use crate::pagination::{calculate_pagination, PAGE_SIZE};
use crate::AppState;

/// Name used when neither the form nor the file part supplies one
pub const DEFAULT_FILENAME: &str = "document.txt";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedResponse {
    pub document_id: Uuid,
    pub status: AnalysisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("File too large".to_string())
    } else {
        ApiError::BadRequest(format!("Invalid upload: {}", e.body_text()))
    }
}

/// Caller's document, or 404 for unknown ids and other users' documents
pub(crate) async fn owned_document(state: &AppState, user_id: Uuid, id: &str) -> ApiResult<Document> {
    let id = Uuid::parse_str(id.trim()).map_err(|_| ApiError::document_not_found())?;
    match db::get_document(&state.db, id).await? {
        Some(document) if document.user_id == user_id => Ok(document),
        _ => Err(ApiError::document_not_found()),
    }
}

/// POST /api/documents/upload
pub async fn upload_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    let mut form_filename: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let part_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((part_name, bytes.to_vec()));
            }
            Some("filename") => {
                form_filename = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let Some((part_name, bytes)) = file else {
        return Err(ApiError::BadRequest("No file provided".to_string()));
    };
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("No file provided".to_string()));
    }
    if bytes.len() > state.settings.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "File exceeds the {} byte limit",
            state.settings.max_upload_bytes
        )));
    }

    let filename = [form_filename, part_name]
        .into_iter()
        .flatten()
        .map(|n| n.trim().to_string())
        .find(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

    let text = extract_text(&bytes, &filename).map_err(|e| match e {
        ExtractError::Unsupported(_) => ApiError::UnsupportedMediaType(e.to_string()),
        ExtractError::Empty => ApiError::BadRequest(e.to_string()),
    })?;

    let document = db::create_document(&state.db, user.id, &filename, &text).await?;
    info!(
        document_id = %document.id,
        user_id = %user.id,
        bytes = bytes.len(),
        "Document uploaded"
    );
    state.pipeline.submit(document.id);

    Ok((
        StatusCode::ACCEPTED,
        Json(QueuedResponse {
            document_id: document.id,
            status: AnalysisStatus::Pending,
            message: Some("Document uploaded and analysis started".to_string()),
        }),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentList {
    pub documents: Vec<DocumentSummary>,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total: i64,
}

/// GET /api/documents
pub async fn list_documents(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<DocumentList>> {
    let status = match params.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            AnalysisStatus::parse(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown status: {}", raw)))?,
        ),
        None => None,
    };

    let mut query = DocumentQuery {
        search: params.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
        status,
        limit: PAGE_SIZE,
        offset: 0,
    };

    let total = db::count_documents(&state.db, user.id, &query).await?;
    let pagination = calculate_pagination(total, params.page.unwrap_or(1));
    query.offset = pagination.offset;

    let documents = db::list_documents(&state.db, user.id, &query).await?;

    Ok(Json(DocumentList {
        documents,
        page: pagination.page,
        page_size: PAGE_SIZE,
        total_pages: pagination.total_pages,
        total,
    }))
}

#[derive(Debug, Serialize)]
pub struct DocumentDetail {
    pub document: Document,
    pub analysis: Option<DocumentAnalysis>,
}

/// GET /api/documents/:id
pub async fn get_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DocumentDetail>> {
    let mut document = owned_document(&state, user.id, &id).await?;
    let analysis = document.analysis_result.take();
    Ok(Json(DocumentDetail { document, analysis }))
}

/// DELETE /api/documents/:id
pub async fn delete_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let document = owned_document(&state, user.id, &id).await?;
    if !db::delete_document(&state.db, document.id).await? {
        return Err(ApiError::document_not_found());
    }

    info!(document_id = %document.id, "Document deleted");
    state.event_bus.emit_lossy(LegalEaseEvent::DocumentDeleted {
        document_id: document.id,
        user_id: user.id,
        timestamp: time::now(),
    });
    Ok(Json(json!({ "success": true })))
}

/// POST /api/documents/:id/analyze
///
/// A document still waiting in the queue is left there. Completed and
/// failed documents go back to `pending` and are resubmitted.
pub async fn reanalyze_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let document = owned_document(&state, user.id, &id).await?;
    let already_running = || ApiError::Conflict("Analysis already in progress".to_string());

    match document.analysis_status {
        AnalysisStatus::Analyzing => return Err(already_running()),
        AnalysisStatus::Pending => {}
        AnalysisStatus::Completed | AnalysisStatus::Error => {
            if !db::requeue_analysis(&state.db, document.id).await? {
                return Err(already_running());
            }
            state.pipeline.emit_status(
                document.id,
                user.id,
                Some(document.analysis_status),
                AnalysisStatus::Pending,
                None,
            );
            info!(document_id = %document.id, "Re-analysis requested");
            state.pipeline.submit(document.id);
        }
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(QueuedResponse {
            document_id: document.id,
            status: AnalysisStatus::Pending,
            message: None,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeTextRequest {
    pub text: Option<String>,
    pub filename: Option<String>,
}

/// POST /api/analyze
///
/// Analyses raw text without storing it. Used by the browser extension for
/// the page it is looking at.
pub async fn analyze_text(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Json(req): Json<AnalyzeTextRequest>,
) -> ApiResult<Json<DocumentAnalysis>> {
    let text = req.text.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest("No text provided".to_string()));
    }
    let filename = req
        .filename
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| "page.txt".to_string());

    let analysis = state
        .pipeline
        .analyze_text(&text, &filename, Uuid::new_v4())
        .await?;
    Ok(Json(analysis))
}

pub fn document_routes() -> Router<AppState> {
    Router::new()
        .route("/api/documents", get(list_documents))
        .route("/api/documents/upload", post(upload_document))
        .route(
            "/api/documents/:id",
            get(get_document).delete(delete_document),
        )
        .route("/api/documents/:id/analyze", post(reanalyze_document))
        .route("/api/analyze", post(analyze_text))
}
