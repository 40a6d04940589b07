//! Analysis export formats

use legalease_common::models::{Document, DocumentAnalysis};
use serde::Serialize;

pub const CSV_HEADER: &str = "Clause,Category,Risk Level,Risk Score,Plain Language";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// A rendered export ready to be sent as an attachment
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

impl ExportFile {
    /// `Content-Disposition` header value
    pub fn disposition(&self) -> String {
        let safe: String = self
            .filename
            .chars()
            .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
            .collect();
        format!("attachment; filename=\"{}\"", safe)
    }
}

#[derive(Serialize)]
struct JsonExport<'a> {
    document: &'a Document,
    analysis: &'a DocumentAnalysis,
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// One quoted row per clause under [`CSV_HEADER`]
pub fn to_csv(analysis: &DocumentAnalysis) -> String {
    let mut out = String::from(CSV_HEADER);
    for clause in &analysis.clauses {
        out.push('\n');
        let row = [
            csv_field(&clause.text),
            csv_field(&clause.category),
            csv_field(clause.risk_level.as_str()),
            csv_field(&clause.risk_score.to_string()),
            csv_field(&clause.plain_language),
        ];
        out.push_str(&row.join(","));
    }
    out
}

pub fn render(
    document: &Document,
    analysis: &DocumentAnalysis,
    format: ExportFormat,
) -> Result<ExportFile, serde_json::Error> {
    let body = match format {
        ExportFormat::Json => serde_json::to_string_pretty(&JsonExport { document, analysis })?,
        ExportFormat::Csv => to_csv(analysis),
    };
    Ok(ExportFile {
        filename: format!("{}_analysis.{}", document.filename, format.extension()),
        content_type: format.content_type(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use legalease_common::models::{AnalysisStatus, Clause, ClausePosition, RiskLevel};
    use uuid::Uuid;

    fn fixture() -> (Document, DocumentAnalysis) {
        let document = Document {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            filename: "lease.txt".to_string(),
            original_text: "text".to_string(),
            uploaded_at: Utc::now(),
            analysis_status: AnalysisStatus::Completed,
            analysis_error: None,
            analysis_result: None,
        };
        let analysis = DocumentAnalysis {
            id: Uuid::new_v4(),
            document_id: document.id,
            overall_risk_score: 70,
            risk_level: RiskLevel::High,
            clauses: vec![Clause {
                id: Uuid::new_v4(),
                text: "Tenant pays \"all\" repairs, fees".to_string(),
                category: "Payment".to_string(),
                risk_score: 70,
                risk_level: RiskLevel::High,
                explanation: String::new(),
                plain_language: "You fix everything".to_string(),
                analogy: None,
                recommendations: vec![],
                position: ClausePosition::default(),
            }],
            summary: "s".to_string(),
            recommendations: vec![],
            analysis_time: 12,
            created_at: Utc::now(),
            model: "rule-based".to_string(),
        };
        (document, analysis)
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ExportFormat::parse("CSV"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse("json"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::parse("pdf"), None);
    }

    #[test]
    fn test_csv_escapes_quotes() {
        let (_, analysis) = fixture();
        let csv = to_csv(&analysis);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            r#""Tenant pays ""all"" repairs, fees","Payment","high","70","You fix everything""#
        );
    }

    #[test]
    fn test_render_json() {
        let (document, analysis) = fixture();
        let file = render(&document, &analysis, ExportFormat::Json).unwrap();
        assert_eq!(file.filename, "lease.txt_analysis.json");
        assert_eq!(file.content_type, "application/json");
        let value: serde_json::Value = serde_json::from_str(&file.body).unwrap();
        assert_eq!(value["document"]["filename"], "lease.txt");
        assert_eq!(value["analysis"]["overallRiskScore"], 70);
    }

    #[test]
    fn test_disposition_sanitised() {
        let file = ExportFile {
            filename: "a\"b\n.csv".to_string(),
            content_type: "text/csv",
            body: String::new(),
        };
        assert_eq!(file.disposition(), "attachment; filename=\"a_b_.csv\"");
    }
}
