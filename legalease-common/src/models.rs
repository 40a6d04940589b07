//! Domain models
//!
//! Everything here travels over HTTP as camelCase JSON, which is the shape
//! the web client and the browser extension read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Risk bucket for a clause or a whole document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bucket a 0-100 risk score
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=39 => RiskLevel::Low,
            40..=69 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" | "moderate" => Some(RiskLevel::Medium),
            "high" | "critical" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

/// Document analysis lifecycle
///
/// pending → analyzing → completed | error. A re-analysis request moves a
/// terminal document back through analyzing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Analyzing,
    Completed,
    Error,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Analyzing => "analyzing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(AnalysisStatus::Pending),
            "analyzing" => Some(AnalysisStatus::Analyzing),
            "completed" => Some(AnalysisStatus::Completed),
            "error" => Some(AnalysisStatus::Error),
            _ => None,
        }
    }

    /// Completed or failed; nothing is running for the document
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub original_text: String,
    pub uploaded_at: DateTime<Utc>,
    pub analysis_status: AnalysisStatus,
    /// Failure message when `analysis_status` is `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_result: Option<DocumentAnalysis>,
}

impl Document {
    /// Lower-cased file extension, `unknown` when the name has none
    pub fn file_type(&self) -> String {
        file_type(&self.filename)
    }
}

/// Lower-cased extension of a filename, `unknown` when there is none
pub fn file_type(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_lowercase(),
        _ => "unknown".to_string(),
    }
}

/// Library listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: Uuid,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub analysis_status: AnalysisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,
    pub clause_count: usize,
    pub high_risk_clauses: usize,
    pub overall_risk_score: Option<u8>,
    pub risk_level: Option<RiskLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClausePosition {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clause {
    pub id: Uuid,
    pub text: String,
    pub category: String,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub explanation: String,
    pub plain_language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analogy: Option<String>,
    pub recommendations: Vec<String>,
    pub position: ClausePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    pub id: Uuid,
    pub document_id: Uuid,
    pub overall_risk_score: u8,
    pub risk_level: RiskLevel,
    pub clauses: Vec<Clause>,
    pub summary: String,
    pub recommendations: Vec<String>,
    /// Wall-clock duration of the analyst call in milliseconds
    pub analysis_time: u64,
    pub created_at: DateTime<Utc>,
    /// Analyst that produced the result (model name or `rule-based`)
    #[serde(default)]
    pub model: String,
}

impl DocumentAnalysis {
    pub fn high_risk_clauses(&self) -> usize {
        self.clauses
            .iter()
            .filter(|c| c.risk_level == RiskLevel::High)
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClauseExplanation {
    pub explanation: String,
    pub plain_language: String,
    pub analogy: String,
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskTrendPoint {
    pub date: String,
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub category: String,
    pub count: u32,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTypeStat {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub count: u32,
    pub average_risk: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Upload,
    Analysis,
    Review,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub document: String,
    pub timestamp: DateTime<Utc>,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsData {
    pub total_documents: u32,
    pub high_risk_clauses: u32,
    pub average_risk_score: u32,
    pub average_analysis_time: u64,
    pub risk_trends: Vec<RiskTrendPoint>,
    pub clause_categories: Vec<CategoryStat>,
    pub document_types: Vec<DocumentTypeStat>,
    pub recent_activity: Vec<Activity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_from_score_boundaries() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(39), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(40), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(69), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(70), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::High);
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert_eq!(RiskLevel::Low.max(RiskLevel::High), RiskLevel::High);
    }

    #[test]
    fn test_risk_level_parse_is_lenient() {
        assert_eq!(RiskLevel::parse(" HIGH "), Some(RiskLevel::High));
        assert_eq!(RiskLevel::parse("moderate"), Some(RiskLevel::Medium));
        assert_eq!(RiskLevel::parse("unknown"), None);
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&AnalysisStatus::Analyzing).unwrap();
        assert_eq!(json, "\"analyzing\"");
        assert!(AnalysisStatus::Error.is_terminal());
        assert!(!AnalysisStatus::Pending.is_terminal());
        assert_eq!(AnalysisStatus::parse("completed"), Some(AnalysisStatus::Completed));
    }

    #[test]
    fn test_file_type() {
        assert_eq!(file_type("Lease.PDF"), "pdf");
        assert_eq!(file_type("terms.of.service.txt"), "txt");
        assert_eq!(file_type("README"), "unknown");
        assert_eq!(file_type(".env"), "unknown");
        assert_eq!(file_type("trailing."), "unknown");
    }

    #[test]
    fn test_document_serializes_camel_case() {
        let doc = Document {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            filename: "nda.txt".to_string(),
            original_text: "text".to_string(),
            uploaded_at: Utc::now(),
            analysis_status: AnalysisStatus::Pending,
            analysis_error: None,
            analysis_result: None,
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["analysisStatus"], "pending");
        assert!(value.get("originalText").is_some());
        assert!(value.get("analysisResult").is_none());
    }
}
