//! Stored analyses
//!
//! The full analysis is kept as JSON; score, level, counts and timing are
//! duplicated into columns for listing and analytics queries.

use chrono::{DateTime, Utc};
use legalease_common::models::DocumentAnalysis;
use legalease_common::{time, Result};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::parse_guid;

/// A completed document with its analysis, as analytics consumes it
#[derive(Debug, Clone)]
pub struct AnalyzedDocument {
    pub document_id: Uuid,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub analysis: DocumentAnalysis,
}

/// Insert or replace the analysis for `analysis.document_id`
pub(crate) async fn upsert_analysis(
    conn: &mut SqliteConnection,
    analysis: &DocumentAnalysis,
) -> Result<()> {
    let json = serde_json::to_string(analysis)?;

    sqlx::query(
        r#"
        INSERT INTO analyses (
            guid, document_id, overall_risk_score, risk_level, clause_count,
            high_risk_clauses, analysis_time_ms, model, analysis_json, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(document_id) DO UPDATE SET
            guid = excluded.guid,
            overall_risk_score = excluded.overall_risk_score,
            risk_level = excluded.risk_level,
            clause_count = excluded.clause_count,
            high_risk_clauses = excluded.high_risk_clauses,
            analysis_time_ms = excluded.analysis_time_ms,
            model = excluded.model,
            analysis_json = excluded.analysis_json,
            created_at = excluded.created_at
        "#,
    )
    .bind(analysis.id.to_string())
    .bind(analysis.document_id.to_string())
    .bind(analysis.overall_risk_score as i64)
    .bind(analysis.risk_level.as_str())
    .bind(analysis.clauses.len() as i64)
    .bind(analysis.high_risk_clauses() as i64)
    .bind(analysis.analysis_time as i64)
    .bind(&analysis.model)
    .bind(json)
    .bind(time::to_db(&analysis.created_at))
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn get_analysis(pool: &SqlitePool, document_id: Uuid) -> Result<Option<DocumentAnalysis>> {
    let json: Option<String> =
        sqlx::query_scalar("SELECT analysis_json FROM analyses WHERE document_id = ?")
            .bind(document_id.to_string())
            .fetch_optional(pool)
            .await?;

    Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
}

/// Every completed document of `user_id` that has an analysis, oldest first
pub async fn completed_with_analysis(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<AnalyzedDocument>> {
    let rows = sqlx::query(
        r#"
        SELECT d.guid, d.filename, d.uploaded_at, a.analysis_json
        FROM documents d
        JOIN analyses a ON a.document_id = d.guid
        WHERE d.user_id = ? AND d.analysis_status = 'completed'
        ORDER BY a.created_at ASC
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let guid: String = row.get("guid");
            let uploaded_at: String = row.get("uploaded_at");
            let json: String = row.get("analysis_json");
            Ok(AnalyzedDocument {
                document_id: parse_guid("documents.guid", &guid)?,
                filename: row.get("filename"),
                uploaded_at: time::from_db("documents.uploaded_at", &uploaded_at)?,
                analysis: serde_json::from_str(&json)?,
            })
        })
        .collect()
}
