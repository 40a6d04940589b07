//! Asynchronous document analysis
//!
//! Uploads return immediately; the analysis runs on a background task and
//! the outcome is written back to the document's status. Clients learn about
//! it by polling `GET /api/documents/:id` or from the SSE stream.

use legalease_common::events::{EventBus, LegalEaseEvent};
use legalease_common::models::{AnalysisStatus, DocumentAnalysis};
use legalease_common::{time, Error, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::ai::{AiError, Analyst};
use crate::db;

/// How a pipeline run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(DocumentAnalysis),
    Failed(String),
    /// Document missing, deleted mid-run, or already being analyzed
    Skipped,
}

/// Bounded background analysis runner
#[derive(Clone)]
pub struct AnalysisPipeline {
    db: SqlitePool,
    analyst: Arc<dyn Analyst>,
    events: EventBus,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl AnalysisPipeline {
    pub fn new(
        db: SqlitePool,
        analyst: Arc<dyn Analyst>,
        events: EventBus,
        max_concurrent: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            db,
            analyst,
            events,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
        }
    }

    pub fn analyst(&self) -> &Arc<dyn Analyst> {
        &self.analyst
    }

    /// Queue a document for analysis on a background task
    pub fn submit(&self, document_id: Uuid) -> JoinHandle<()> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            let _permit = match pipeline.permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!(document_id = %document_id, "Analysis queue closed");
                    return;
                }
            };

            match pipeline.run(document_id).await {
                Ok(RunOutcome::Completed(analysis)) => info!(
                    document_id = %document_id,
                    score = analysis.overall_risk_score,
                    clauses = analysis.clauses.len(),
                    elapsed_ms = analysis.analysis_time,
                    "Analysis completed"
                ),
                Ok(RunOutcome::Failed(message)) => warn!(
                    document_id = %document_id,
                    error = %message,
                    "Analysis failed"
                ),
                Ok(RunOutcome::Skipped) => debug!(document_id = %document_id, "Analysis skipped"),
                Err(e) => error!(
                    document_id = %document_id,
                    error = %e,
                    "Analysis task failed"
                ),
            }
        })
    }

    /// Analyze one document now, recording the outcome
    pub async fn run(&self, document_id: Uuid) -> Result<RunOutcome> {
        let Some(document) = db::get_document(&self.db, document_id).await? else {
            return Ok(RunOutcome::Skipped);
        };

        if !db::begin_analysis(&self.db, document_id).await? {
            return Ok(RunOutcome::Skipped);
        }
        self.emit_status(
            document_id,
            document.user_id,
            Some(document.analysis_status),
            AnalysisStatus::Analyzing,
            None,
        );

        let result = self
            .analyze_text(&document.original_text, &document.filename, document_id)
            .await;

        match result {
            Ok(analysis) => match db::complete_analysis(&self.db, &analysis).await {
                Ok(()) => {
                    self.emit_status(
                        document_id,
                        document.user_id,
                        Some(AnalysisStatus::Analyzing),
                        AnalysisStatus::Completed,
                        None,
                    );
                    self.events.emit_lossy(LegalEaseEvent::AnalysisCompleted {
                        document_id,
                        user_id: document.user_id,
                        overall_risk_score: analysis.overall_risk_score,
                        risk_level: analysis.risk_level,
                        clause_count: analysis.clauses.len(),
                        timestamp: time::now(),
                    });
                    Ok(RunOutcome::Completed(analysis))
                }
                Err(Error::NotFound(_)) => Ok(RunOutcome::Skipped),
                Err(e) => {
                    let message = format!("Failed to store analysis: {}", e);
                    self.fail(document_id, document.user_id, &message).await?;
                    Err(e)
                }
            },
            Err(e) => {
                let message = e.to_string();
                self.fail(document_id, document.user_id, &message).await?;
                Ok(RunOutcome::Failed(message))
            }
        }
    }

    /// Run the analyst over `text` under the configured timeout
    ///
    /// `analysis_time` is the measured duration of the analyst call.
    pub async fn analyze_text(
        &self,
        text: &str,
        filename: &str,
        document_id: Uuid,
    ) -> std::result::Result<DocumentAnalysis, AiError> {
        let started = Instant::now();
        let draft = tokio::time::timeout(self.timeout, self.analyst.analyze_document(text, filename))
            .await
            .map_err(|_| AiError::Timeout(self.timeout))??;
        Ok(draft.into_analysis(document_id, started.elapsed()))
    }

    async fn fail(&self, document_id: Uuid, user_id: Uuid, message: &str) -> Result<()> {
        db::fail_analysis(&self.db, document_id, message).await?;
        self.emit_status(
            document_id,
            user_id,
            Some(AnalysisStatus::Analyzing),
            AnalysisStatus::Error,
            Some(message.to_string()),
        );
        Ok(())
    }

    pub(crate) fn emit_status(
        &self,
        document_id: Uuid,
        user_id: Uuid,
        old_status: Option<AnalysisStatus>,
        new_status: AnalysisStatus,
        message: Option<String>,
    ) {
        self.events.emit_lossy(LegalEaseEvent::DocumentStatusChanged {
            document_id,
            user_id,
            old_status,
            new_status,
            message,
            timestamp: time::now(),
        });
    }

    /// Requeue work left behind by a previous run
    ///
    /// Documents stuck in `analyzing` go back to `pending`, then every
    /// pending document is submitted. Returns the number submitted.
    pub async fn resume_interrupted(&self) -> Result<usize> {
        let reset = db::reset_interrupted(&self.db).await?;
        if reset > 0 {
            warn!("Reset {} interrupted analyses to pending", reset);
        }

        let pending = db::list_pending(&self.db).await?;
        for id in &pending {
            self.submit(*id);
        }
        if !pending.is_empty() {
            info!("Resubmitted {} pending documents", pending.len());
        }
        Ok(pending.len())
    }
}
