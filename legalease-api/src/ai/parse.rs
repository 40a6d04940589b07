//! Turning model replies into validated domain values
//!
//! Models wrap JSON in prose or code fences and get numbers and offsets
//! wrong. Everything here is lenient on input and strict on output: scores
//! land in 0-100, every clause has a risk level and an id, and clause
//! positions are character offsets into the original text.

use legalease_common::models::{Clause, ClauseExplanation, ClausePosition, RiskLevel};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use super::{AiError, AnalysisDraft};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawAnalysis {
    overall_risk_score: Option<f64>,
    risk_level: Option<String>,
    summary: String,
    recommendations: Vec<String>,
    clauses: Vec<RawClause>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawClause {
    text: String,
    category: Option<String>,
    risk_score: Option<f64>,
    risk_level: Option<String>,
    explanation: String,
    #[serde(alias = "summary")]
    plain_language: String,
    analogy: Option<String>,
    recommendations: Vec<String>,
    position: Option<RawPosition>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPosition {
    start: Option<f64>,
    end: Option<f64>,
}

/// Slice from the first `{` to the last `}` of a reply
pub fn extract_json_object(reply: &str) -> Result<&str, AiError> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if e > s => Ok(&reply[s..=e]),
        _ => Err(AiError::InvalidResponse(
            "no JSON object in model reply".to_string(),
        )),
    }
}

fn parse_object<T: DeserializeOwned>(reply: &str) -> Result<T, AiError> {
    let json = extract_json_object(reply)?;
    serde_json::from_str(json).map_err(|e| AiError::InvalidResponse(e.to_string()))
}

/// Clamp and round a model-supplied score into 0-100
pub fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

fn level_for(raw: Option<&str>, score: u8) -> RiskLevel {
    raw.and_then(RiskLevel::parse)
        .unwrap_or_else(|| RiskLevel::from_score(score))
}

fn non_empty(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn char_offset(text: &str, byte_idx: usize) -> usize {
    text[..byte_idx].chars().count()
}

/// Locate `needle` in `text` as character offsets
///
/// Searches from `from_byte` first so repeated clause texts map to
/// successive occurrences, then from the start. Returns the match and the
/// byte index just past it.
pub fn locate(text: &str, needle: &str, from_byte: usize) -> Option<(ClausePosition, usize)> {
    let needle = needle.trim();
    if needle.is_empty() {
        return None;
    }
    let from_byte = if text.is_char_boundary(from_byte) { from_byte } else { 0 };
    let byte_idx = text[from_byte..]
        .find(needle)
        .map(|i| i + from_byte)
        .or_else(|| text.find(needle))?;
    let start = char_offset(text, byte_idx);
    let position = ClausePosition {
        start,
        end: start + needle.chars().count(),
    };
    Some((position, byte_idx + needle.len()))
}

fn fallback_position(raw: Option<&RawPosition>, text_chars: usize) -> ClausePosition {
    let to_offset = |v: Option<f64>| {
        v.filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| (n as usize).min(text_chars))
            .unwrap_or(0)
    };
    match raw {
        Some(p) => {
            let start = to_offset(p.start);
            let end = to_offset(p.end).max(start);
            ClausePosition { start, end }
        }
        None => ClausePosition::default(),
    }
}

/// Parse a document-analysis reply against the text it describes
pub fn parse_analysis(reply: &str, original_text: &str, model: &str) -> Result<AnalysisDraft, AiError> {
    let raw: RawAnalysis = parse_object(reply)?;
    let text_chars = original_text.chars().count();
    let mut cursor = 0usize;

    let clauses: Vec<Clause> = raw
        .clauses
        .into_iter()
        .filter(|c| !c.text.trim().is_empty())
        .map(|c| {
            let score = c.risk_score.map(clamp_score).unwrap_or_else(|| {
                c.risk_level
                    .as_deref()
                    .and_then(RiskLevel::parse)
                    .map(default_score)
                    .unwrap_or(0)
            });
            let position = match locate(original_text, &c.text, cursor) {
                Some((position, next)) => {
                    cursor = next;
                    position
                }
                None => fallback_position(c.position.as_ref(), text_chars),
            };
            let plain_language = if c.plain_language.trim().is_empty() {
                c.explanation.clone()
            } else {
                c.plain_language
            };
            Clause {
                id: Uuid::new_v4(),
                text: c.text.trim().to_string(),
                category: c
                    .category
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "General".to_string()),
                risk_score: score,
                risk_level: level_for(c.risk_level.as_deref(), score),
                explanation: c.explanation,
                plain_language,
                analogy: c
                    .analogy
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
                recommendations: non_empty(c.recommendations),
                position,
            }
        })
        .collect();

    let overall = match raw.overall_risk_score {
        Some(score) => clamp_score(score),
        None if !clauses.is_empty() => {
            let total: u32 = clauses.iter().map(|c| c.risk_score as u32).sum();
            clamp_score(total as f64 / clauses.len() as f64)
        }
        None => 0,
    };

    Ok(AnalysisDraft {
        overall_risk_score: overall,
        risk_level: level_for(raw.risk_level.as_deref(), overall),
        clauses,
        summary: raw.summary.trim().to_string(),
        recommendations: non_empty(raw.recommendations),
        model: model.to_string(),
    })
}

/// Midpoint score for a level when the model gave only the level
fn default_score(level: RiskLevel) -> u8 {
    match level {
        RiskLevel::Low => 20,
        RiskLevel::Medium => 55,
        RiskLevel::High => 85,
    }
}

/// Parse a clause-explanation reply
pub fn parse_explanation(reply: &str) -> Result<ClauseExplanation, AiError> {
    let mut explanation: ClauseExplanation = parse_object(reply)?;
    explanation.risks = non_empty(explanation.risks);
    if explanation.explanation.trim().is_empty() && explanation.plain_language.trim().is_empty() {
        return Err(AiError::InvalidResponse(
            "explanation is empty".to_string(),
        ));
    }
    Ok(explanation)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "1. The Company may terminate this agreement at any time.\n\
                        2. User agrees to indemnify the Company.\n";

    #[test]
    fn test_extract_json_from_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"a\": {\"b\": 1}}\n```\nThanks";
        assert_eq!(extract_json_object(reply).unwrap(), "{\"a\": {\"b\": 1}}");
    }

    #[test]
    fn test_extract_json_missing_object() {
        assert!(matches!(
            extract_json_object("I cannot help with that."),
            Err(AiError::InvalidResponse(_))
        ));
        assert!(extract_json_object("} backwards {").is_err());
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(-5.0), 0);
        assert_eq!(clamp_score(64.6), 65);
        assert_eq!(clamp_score(250.0), 100);
        assert_eq!(clamp_score(f64::NAN), 0);
    }

    #[test]
    fn test_parse_analysis_normalizes_clauses() {
        let reply = r#"```json
        {
          "overallRiskScore": 72.4,
          "riskLevel": "medium",
          "summary": " A service agreement. ",
          "recommendations": ["Negotiate notice period", ""],
          "clauses": [
            {
              "text": "User agrees to indemnify the Company.",
              "category": "Liability",
              "riskScore": 120,
              "explanation": "Broad indemnity.",
              "plainLanguage": "You pay their legal bills.",
              "analogy": "",
              "position": {"start": 999, "end": 1000}
            },
            {
              "text": "The Company may terminate this agreement at any time.",
              "riskLevel": "medium",
              "summary": "They can end it whenever."
            },
            { "text": "   " }
          ]
        }
        ```"#;

        let draft = parse_analysis(reply, TEXT, "test-model").unwrap();

        assert_eq!(draft.overall_risk_score, 72);
        assert_eq!(draft.risk_level, RiskLevel::Medium);
        assert_eq!(draft.summary, "A service agreement.");
        assert_eq!(draft.recommendations, vec!["Negotiate notice period".to_string()]);
        assert_eq!(draft.model, "test-model");
        assert_eq!(draft.clauses.len(), 2);

        let indemnity = &draft.clauses[0];
        assert_eq!(indemnity.risk_score, 100);
        assert_eq!(indemnity.risk_level, RiskLevel::High);
        assert!(indemnity.analogy.is_none());
        let start = TEXT.find("User agrees").unwrap();
        assert_eq!(indemnity.position.start, start);
        assert_eq!(
            indemnity.position.end,
            start + "User agrees to indemnify the Company.".len()
        );

        let termination = &draft.clauses[1];
        assert_eq!(termination.category, "General");
        assert_eq!(termination.risk_score, 55);
        assert_eq!(termination.plain_language, "They can end it whenever.");
        assert_eq!(termination.position.start, 3);
        assert_ne!(indemnity.id, termination.id);
    }

    #[test]
    fn test_parse_analysis_derives_missing_overall() {
        let reply = r#"{"clauses": [
            {"text": "not in the document", "riskScore": 30, "position": {"start": 5, "end": 9000}},
            {"text": "also absent", "riskScore": 90}
        ]}"#;

        let draft = parse_analysis(reply, "short text", "m").unwrap();

        assert_eq!(draft.overall_risk_score, 60);
        assert_eq!(draft.risk_level, RiskLevel::Medium);
        assert_eq!(draft.clauses[0].position, ClausePosition { start: 5, end: 10 });
        assert_eq!(draft.clauses[1].position, ClausePosition::default());
    }

    #[test]
    fn test_locate_uses_char_offsets_and_cursor() {
        let text = "Préambule. Fee applies. Fee applies.";
        let (first, next) = locate(text, "Fee applies.", 0).unwrap();
        assert_eq!(first.start, 11);
        let (second, _) = locate(text, "Fee applies.", next).unwrap();
        assert_eq!(second.start, 24);
        assert_eq!(second.end, 36);
        assert!(locate(text, "   ", 0).is_none());
    }

    #[test]
    fn test_parse_explanation() {
        let reply = r#"Sure! {"explanation": "Limits damages.", "plainLanguage": "They pay less.",
                       "analogy": "Like a capped insurance policy.", "risks": ["Low recovery", " "]}"#;
        let explanation = parse_explanation(reply).unwrap();
        assert_eq!(explanation.plain_language, "They pay less.");
        assert_eq!(explanation.risks, vec!["Low recovery".to_string()]);
    }

    #[test]
    fn test_parse_explanation_rejects_empty() {
        let reply = r#"{"explanation": "", "plainLanguage": " ", "analogy": ""}"#;
        assert!(parse_explanation(reply).is_err());
    }
}
