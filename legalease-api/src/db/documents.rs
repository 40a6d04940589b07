//! Documents and their analysis status
//!
//! Status transitions are conditional updates so that two requests can never
//! both move the same document into `analyzing`.

use legalease_common::models::{AnalysisStatus, Document, DocumentAnalysis, DocumentSummary, RiskLevel};
use legalease_common::{time, Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::analyses::upsert_analysis;
use super::parse_guid;

/// Library listing filter
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    /// Case-insensitive filename substring
    pub search: Option<String>,
    pub status: Option<AnalysisStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl DocumentQuery {
    fn like_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                let escaped = s
                    .replace('\\', "\\\\")
                    .replace('%', "\\%")
                    .replace('_', "\\_");
                format!("%{}%", escaped)
            })
    }
}

fn parse_status(value: &str) -> Result<AnalysisStatus> {
    AnalysisStatus::parse(value)
        .ok_or_else(|| Error::Internal(format!("Unknown analysis status: {}", value)))
}

fn document_from_row(row: &SqliteRow) -> Result<Document> {
    let guid: String = row.get("guid");
    let user_id: String = row.get("user_id");
    let uploaded_at: String = row.get("uploaded_at");
    let status: String = row.get("analysis_status");
    let analysis_json: Option<String> = row.get("analysis_json");

    Ok(Document {
        id: parse_guid("documents.guid", &guid)?,
        user_id: parse_guid("documents.user_id", &user_id)?,
        filename: row.get("filename"),
        original_text: row.get("original_text"),
        uploaded_at: time::from_db("documents.uploaded_at", &uploaded_at)?,
        analysis_status: parse_status(&status)?,
        analysis_error: row.get("analysis_error"),
        analysis_result: analysis_json.map(|j| serde_json::from_str(&j)).transpose()?,
    })
}

fn summary_from_row(row: &SqliteRow) -> Result<DocumentSummary> {
    let guid: String = row.get("guid");
    let uploaded_at: String = row.get("uploaded_at");
    let status: String = row.get("analysis_status");
    let clause_count: Option<i64> = row.get("clause_count");
    let high_risk: Option<i64> = row.get("high_risk_clauses");
    let score: Option<i64> = row.get("overall_risk_score");
    let level: Option<String> = row.get("risk_level");

    Ok(DocumentSummary {
        id: parse_guid("documents.guid", &guid)?,
        filename: row.get("filename"),
        uploaded_at: time::from_db("documents.uploaded_at", &uploaded_at)?,
        analysis_status: parse_status(&status)?,
        analysis_error: row.get("analysis_error"),
        clause_count: clause_count.unwrap_or(0) as usize,
        high_risk_clauses: high_risk.unwrap_or(0) as usize,
        overall_risk_score: score.map(|s| s.clamp(0, 100) as u8),
        risk_level: level.as_deref().and_then(RiskLevel::parse),
    })
}

/// Store a new document in `pending` state
pub async fn create_document(
    pool: &SqlitePool,
    user_id: Uuid,
    filename: &str,
    text: &str,
) -> Result<Document> {
    let document = Document {
        id: Uuid::new_v4(),
        user_id,
        filename: filename.to_string(),
        original_text: text.to_string(),
        uploaded_at: time::now(),
        analysis_status: AnalysisStatus::Pending,
        analysis_error: None,
        analysis_result: None,
    };
    let stamp = time::to_db(&document.uploaded_at);

    sqlx::query(
        r#"
        INSERT INTO documents (
            guid, user_id, filename, original_text, uploaded_at,
            analysis_status, analysis_error, updated_at
        ) VALUES (?, ?, ?, ?, ?, 'pending', NULL, ?)
        "#,
    )
    .bind(document.id.to_string())
    .bind(user_id.to_string())
    .bind(&document.filename)
    .bind(&document.original_text)
    .bind(&stamp)
    .bind(&stamp)
    .execute(pool)
    .await?;

    Ok(document)
}

/// Document with its analysis attached when one exists
pub async fn get_document(pool: &SqlitePool, id: Uuid) -> Result<Option<Document>> {
    let row = sqlx::query(
        r#"
        SELECT d.guid, d.user_id, d.filename, d.original_text, d.uploaded_at,
               d.analysis_status, d.analysis_error, a.analysis_json
        FROM documents d
        LEFT JOIN analyses a ON a.document_id = d.guid
        WHERE d.guid = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(document_from_row).transpose()
}

/// One page of a user's documents, newest first
pub async fn list_documents(
    pool: &SqlitePool,
    user_id: Uuid,
    query: &DocumentQuery,
) -> Result<Vec<DocumentSummary>> {
    let pattern = query.like_pattern();
    let status = query.status.map(|s| s.as_str());

    let rows = sqlx::query(
        r#"
        SELECT d.guid, d.filename, d.uploaded_at, d.analysis_status, d.analysis_error,
               a.clause_count, a.high_risk_clauses, a.overall_risk_score, a.risk_level
        FROM documents d
        LEFT JOIN analyses a ON a.document_id = d.guid
        WHERE d.user_id = ?
          AND (? IS NULL OR d.filename LIKE ? ESCAPE '\')
          AND (? IS NULL OR d.analysis_status = ?)
        ORDER BY d.uploaded_at DESC, d.rowid DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id.to_string())
    .bind(&pattern)
    .bind(&pattern)
    .bind(status)
    .bind(status)
    .bind(query.limit)
    .bind(query.offset)
    .fetch_all(pool)
    .await?;

    rows.iter().map(summary_from_row).collect()
}

/// Number of documents matching `query`, ignoring its limit and offset
pub async fn count_documents(pool: &SqlitePool, user_id: Uuid, query: &DocumentQuery) -> Result<i64> {
    let pattern = query.like_pattern();
    let status = query.status.map(|s| s.as_str());

    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM documents d
        WHERE d.user_id = ?
          AND (? IS NULL OR d.filename LIKE ? ESCAPE '\')
          AND (? IS NULL OR d.analysis_status = ?)
        "#,
    )
    .bind(user_id.to_string())
    .bind(&pattern)
    .bind(&pattern)
    .bind(status)
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Move a document into `analyzing`
///
/// Returns false when the document is missing or already analyzing.
pub async fn begin_analysis(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET analysis_status = 'analyzing', analysis_error = NULL, updated_at = ?
        WHERE guid = ? AND analysis_status != 'analyzing'
        "#,
    )
    .bind(time::to_db(&time::now()))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Put a finished document (`completed` or `error`) back to `pending`
///
/// Returns false when the document is missing, queued or analyzing.
pub async fn requeue_analysis(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET analysis_status = 'pending', analysis_error = NULL, updated_at = ?
        WHERE guid = ? AND analysis_status IN ('completed', 'error')
        "#,
    )
    .bind(time::to_db(&time::now()))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Store the analysis and mark the document `completed` atomically
pub async fn complete_analysis(pool: &SqlitePool, analysis: &DocumentAnalysis) -> Result<()> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE documents
        SET analysis_status = 'completed', analysis_error = NULL, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(time::to_db(&time::now()))
    .bind(analysis.document_id.to_string())
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        // Deleted while the analyst was running
        return Err(Error::NotFound(format!("Document {}", analysis.document_id)));
    }

    upsert_analysis(&mut *tx, analysis).await?;
    tx.commit().await?;

    Ok(())
}

/// Mark a document `error` with a message
pub async fn fail_analysis(pool: &SqlitePool, id: Uuid, message: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE documents
        SET analysis_status = 'error', analysis_error = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(message)
    .bind(time::to_db(&time::now()))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Return documents left `analyzing` by a previous run to `pending`
pub async fn reset_interrupted(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE documents SET analysis_status = 'pending', updated_at = ? WHERE analysis_status = 'analyzing'",
    )
    .bind(time::to_db(&time::now()))
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Ids of all `pending` documents, oldest first
pub async fn list_pending(pool: &SqlitePool) -> Result<Vec<Uuid>> {
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT guid FROM documents WHERE analysis_status = 'pending' ORDER BY uploaded_at ASC, rowid ASC",
    )
    .fetch_all(pool)
    .await?;

    ids.iter().map(|id| parse_guid("documents.guid", id)).collect()
}

/// Delete a document and its analysis, returning whether it existed
pub async fn delete_document(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM analyses WHERE document_id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM documents WHERE guid = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_user, get_analysis};
    use chrono::Utc;
    use legalease_common::db::init_memory_database;

    async fn setup() -> (SqlitePool, Uuid) {
        let pool = init_memory_database().await.unwrap();
        let user = create_user(&pool, "d@example.com", "D", "h").await.unwrap().unwrap();
        (pool, user.id)
    }

    fn analysis_for(document_id: Uuid, score: u8) -> DocumentAnalysis {
        DocumentAnalysis {
            id: Uuid::new_v4(),
            document_id,
            overall_risk_score: score,
            risk_level: RiskLevel::from_score(score),
            clauses: vec![],
            summary: "ok".to_string(),
            recommendations: vec![],
            analysis_time: 42,
            created_at: Utc::now(),
            model: "rule-based".to_string(),
        }
    }

    fn page() -> DocumentQuery {
        DocumentQuery {
            limit: 20,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_status_lifecycle() {
        let (pool, user_id) = setup().await;
        let doc = create_document(&pool, user_id, "a.txt", "text").await.unwrap();
        assert_eq!(doc.analysis_status, AnalysisStatus::Pending);

        assert!(begin_analysis(&pool, doc.id).await.unwrap());
        // Second claim loses
        assert!(!begin_analysis(&pool, doc.id).await.unwrap());

        complete_analysis(&pool, &analysis_for(doc.id, 80)).await.unwrap();
        let stored = get_document(&pool, doc.id).await.unwrap().unwrap();
        assert_eq!(stored.analysis_status, AnalysisStatus::Completed);
        assert_eq!(stored.analysis_result.unwrap().overall_risk_score, 80);

        // Re-analysis replaces the stored result
        assert!(begin_analysis(&pool, doc.id).await.unwrap());
        complete_analysis(&pool, &analysis_for(doc.id, 20)).await.unwrap();
        assert_eq!(get_analysis(&pool, doc.id).await.unwrap().unwrap().overall_risk_score, 20);
    }

    #[tokio::test]
    async fn test_fail_and_retry() {
        let (pool, user_id) = setup().await;
        let doc = create_document(&pool, user_id, "a.txt", "text").await.unwrap();

        begin_analysis(&pool, doc.id).await.unwrap();
        fail_analysis(&pool, doc.id, "model unavailable").await.unwrap();
        let failed = get_document(&pool, doc.id).await.unwrap().unwrap();
        assert_eq!(failed.analysis_status, AnalysisStatus::Error);
        assert_eq!(failed.analysis_error.as_deref(), Some("model unavailable"));

        assert!(requeue_analysis(&pool, doc.id).await.unwrap());
        // Only finished documents can be requeued
        assert!(!requeue_analysis(&pool, doc.id).await.unwrap());
        assert!(begin_analysis(&pool, doc.id).await.unwrap());
        let retried = get_document(&pool, doc.id).await.unwrap().unwrap();
        assert_eq!(retried.analysis_status, AnalysisStatus::Analyzing);
        assert!(retried.analysis_error.is_none());
    }

    #[tokio::test]
    async fn test_complete_after_delete_is_not_found() {
        let (pool, user_id) = setup().await;
        let doc = create_document(&pool, user_id, "a.txt", "text").await.unwrap();
        assert!(delete_document(&pool, doc.id).await.unwrap());
        assert!(matches!(
            complete_analysis(&pool, &analysis_for(doc.id, 10)).await,
            Err(Error::NotFound(_))
        ));
        assert!(!delete_document(&pool, doc.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_analysis() {
        let (pool, user_id) = setup().await;
        let doc = create_document(&pool, user_id, "a.txt", "text").await.unwrap();
        complete_analysis(&pool, &analysis_for(doc.id, 50)).await.unwrap();

        delete_document(&pool, doc.id).await.unwrap();
        assert!(get_document(&pool, doc.id).await.unwrap().is_none());
        assert!(get_analysis(&pool, doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_search_filter_and_count() {
        let (pool, user_id) = setup().await;
        let lease = create_document(&pool, user_id, "Lease_2024.txt", "t").await.unwrap();
        create_document(&pool, user_id, "nda.txt", "t").await.unwrap();
        create_document(&pool, user_id, "lease100%.txt", "t").await.unwrap();
        complete_analysis(&pool, &analysis_for(lease.id, 75)).await.unwrap();

        let all = list_documents(&pool, user_id, &page()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].filename, "lease100%.txt");

        let search = DocumentQuery {
            search: Some("LEASE".to_string()),
            ..page()
        };
        assert_eq!(count_documents(&pool, user_id, &search).await.unwrap(), 2);

        let literal = DocumentQuery {
            search: Some("0%".to_string()),
            ..page()
        };
        let found = list_documents(&pool, user_id, &literal).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].filename, "lease100%.txt");

        let completed = DocumentQuery {
            status: Some(AnalysisStatus::Completed),
            ..page()
        };
        let done = list_documents(&pool, user_id, &completed).await.unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].overall_risk_score, Some(75));
        assert_eq!(done[0].risk_level, Some(RiskLevel::High));

        let paged = DocumentQuery {
            limit: 2,
            offset: 2,
            ..Default::default()
        };
        assert_eq!(list_documents(&pool, user_id, &paged).await.unwrap().len(), 1);
        assert_eq!(count_documents(&pool, Uuid::new_v4(), &page()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reset_interrupted_and_pending() {
        let (pool, user_id) = setup().await;
        let a = create_document(&pool, user_id, "a.txt", "t").await.unwrap();
        let b = create_document(&pool, user_id, "b.txt", "t").await.unwrap();
        let c = create_document(&pool, user_id, "c.txt", "t").await.unwrap();
        begin_analysis(&pool, a.id).await.unwrap();
        begin_analysis(&pool, c.id).await.unwrap();
        complete_analysis(&pool, &analysis_for(c.id, 10)).await.unwrap();

        assert_eq!(reset_interrupted(&pool).await.unwrap(), 1);
        assert_eq!(list_pending(&pool).await.unwrap(), vec![a.id, b.id]);
    }
}
