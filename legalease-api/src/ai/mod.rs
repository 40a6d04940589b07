//! Analysis intelligence
//!
//! Two seams:
//! - [`TextGenerator`]: prompt in, text out. Implemented by [`GeminiClient`].
//! - [`Analyst`]: the operations the service needs (document analysis, clause
//!   explanation, translation). [`ModelAnalyst`] drives any `TextGenerator`;
//!   [`RuleBasedAnalyst`] answers offline from keyword rules.

pub mod gemini;
pub mod model_analyst;
pub mod parse;
pub mod prompts;
pub mod rule_based;

pub use gemini::GeminiClient;
pub use model_analyst::ModelAnalyst;
pub use rule_based::RuleBasedAnalyst;

use async_trait::async_trait;
use chrono::Utc;
use legalease_common::config::{AiProvider, ServiceConfig};
use legalease_common::models::{Clause, ClauseExplanation, DocumentAnalysis, RiskLevel};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Errors from the analysis layer
#[derive(Debug, Error)]
pub enum AiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Model API error {0}: {1}")]
    Api(u16, String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limited by model provider")]
    RateLimited,

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Analysis timed out after {0:?}")]
    Timeout(Duration),
}

/// Prompt-to-text model backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier recorded with each analysis
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

/// Analysis of a document before it is attached to a stored document
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisDraft {
    pub overall_risk_score: u8,
    pub risk_level: RiskLevel,
    pub clauses: Vec<Clause>,
    pub summary: String,
    pub recommendations: Vec<String>,
    pub model: String,
}

impl AnalysisDraft {
    /// Stamp identity and timing onto the draft
    pub fn into_analysis(self, document_id: Uuid, elapsed: Duration) -> DocumentAnalysis {
        DocumentAnalysis {
            id: Uuid::new_v4(),
            document_id,
            overall_risk_score: self.overall_risk_score,
            risk_level: self.risk_level,
            clauses: self.clauses,
            summary: self.summary,
            recommendations: self.recommendations,
            analysis_time: elapsed.as_millis() as u64,
            created_at: Utc::now(),
            model: self.model,
        }
    }
}

/// Operations the service delegates to an analyst
#[async_trait]
pub trait Analyst: Send + Sync {
    /// Name recorded with each analysis and reported by /health
    fn name(&self) -> &str;

    async fn analyze_document(&self, text: &str, filename: &str) -> Result<AnalysisDraft, AiError>;

    async fn explain_clause(&self, clause_text: &str) -> Result<ClauseExplanation, AiError>;

    async fn translate(&self, text: &str, target_language: &str) -> Result<String, AiError>;
}

/// Build the analyst selected by configuration
pub fn build_analyst(config: &ServiceConfig) -> Result<Arc<dyn Analyst>, AiError> {
    match config.effective_provider() {
        AiProvider::Gemini => {
            let api_key = config.ai.api_key.clone().ok_or(AiError::InvalidApiKey)?;
            let client = GeminiClient::new(
                api_key,
                config.ai.model.clone(),
                config.ai.base_url.clone(),
                config.ai.requests_per_minute,
                Duration::from_secs(config.ai.timeout_secs),
            )?;
            info!(model = %config.ai.model, "Using Gemini analyst");
            Ok(Arc::new(ModelAnalyst::new(client)))
        }
        _ => {
            if config.ai.provider == AiProvider::Auto {
                warn!("No Gemini API key configured - using rule-based analyst");
            } else {
                info!("Using rule-based analyst");
            }
            Ok(Arc::new(RuleBasedAnalyst::new()))
        }
    }
}
