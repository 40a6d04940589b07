//! Side-by-side comparison of analysed documents
//!
//! Works on clause categories: a category is common when every analysed
//! document has at least one clause in it, and unique when only one does.

use legalease_common::models::{Document, DocumentAnalysis, RiskLevel};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonClause {
    pub clause: String,
    pub differences: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueClauses {
    pub document: String,
    pub clauses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskComparison {
    pub highest: String,
    pub lowest: String,
    pub analysis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub summary: String,
    pub common_clauses: Vec<CommonClause>,
    pub unique_clauses: Vec<UniqueClauses>,
    pub risk_comparison: RiskComparison,
    pub recommendations: Vec<String>,
}

/// Highest risk level per category within one analysis
fn category_levels(analysis: &DocumentAnalysis) -> BTreeMap<&str, RiskLevel> {
    let mut levels = BTreeMap::new();
    for clause in &analysis.clauses {
        levels
            .entry(clause.category.as_str())
            .and_modify(|l: &mut RiskLevel| *l = (*l).max(clause.risk_level))
            .or_insert(clause.risk_level);
    }
    levels
}

pub fn compare(docs: &[(Document, Option<DocumentAnalysis>)]) -> Comparison {
    let analysed: Vec<(&Document, &DocumentAnalysis)> = docs
        .iter()
        .filter_map(|(d, a)| a.as_ref().map(|a| (d, a)))
        .collect();
    let levels: Vec<BTreeMap<&str, RiskLevel>> =
        analysed.iter().map(|(_, a)| category_levels(a)).collect();

    let all_categories: BTreeSet<&str> = levels.iter().flat_map(|l| l.keys().copied()).collect();

    let common: Vec<&str> = if analysed.len() < 2 {
        Vec::new()
    } else {
        all_categories
            .iter()
            .copied()
            .filter(|c| levels.iter().all(|l| l.contains_key(c)))
            .collect()
    };

    let common_clauses: Vec<CommonClause> = common
        .iter()
        .map(|category| CommonClause {
            clause: category.to_string(),
            differences: analysed
                .iter()
                .zip(&levels)
                .filter_map(|((doc, _), l)| {
                    l.get(category)
                        .map(|level| format!("{}: {} risk", doc.filename, level.as_str()))
                })
                .collect(),
        })
        .collect();

    let unique_clauses: Vec<UniqueClauses> = analysed
        .iter()
        .enumerate()
        .map(|(i, (doc, analysis))| {
            let only_here = |category: &str| {
                levels
                    .iter()
                    .enumerate()
                    .all(|(j, l)| j == i || !l.contains_key(category))
            };
            UniqueClauses {
                document: doc.filename.clone(),
                clauses: analysis
                    .clauses
                    .iter()
                    .filter(|c| analysed.len() > 1 && only_here(c.category.as_str()))
                    .map(|c| c.text.clone())
                    .collect(),
            }
        })
        .collect();

    let risk_comparison = risk_comparison(docs, &analysed);

    let mut recommendations = Vec::new();
    if let Some((doc, analysis)) = analysed.iter().max_by_key(|(_, a)| a.overall_risk_score) {
        if analysis.risk_level == RiskLevel::High {
            recommendations.push(format!("Review the high-risk clauses in {} first.", doc.filename));
        }
    }
    for category in &common {
        let distinct: BTreeSet<RiskLevel> = levels.iter().filter_map(|l| l.get(category).copied()).collect();
        if distinct.len() > 1 {
            recommendations.push(format!(
                "Align the {} terms; their risk differs between documents.",
                category
            ));
        }
    }
    for (doc, analysis) in docs {
        if analysis.is_none() {
            recommendations.push(format!("Analyse {} to include it in the comparison.", doc.filename));
        }
    }
    if recommendations.is_empty() {
        recommendations.push("The documents carry similar risk; standardise wording where possible.".to_string());
    }

    Comparison {
        summary: format!(
            "Compared {} documents ({} analysed); {} clause categor{} shared by all of them.",
            docs.len(),
            analysed.len(),
            common.len(),
            if common.len() == 1 { "y" } else { "ies" },
        ),
        common_clauses,
        unique_clauses,
        risk_comparison,
        recommendations,
    }
}

fn risk_comparison(
    docs: &[(Document, Option<DocumentAnalysis>)],
    analysed: &[(&Document, &DocumentAnalysis)],
) -> RiskComparison {
    let highest = analysed.iter().max_by_key(|(_, a)| a.overall_risk_score);
    let lowest = analysed.iter().min_by_key(|(_, a)| a.overall_risk_score);

    match (highest, lowest) {
        (Some((hd, ha)), Some((ld, la))) => RiskComparison {
            highest: hd.filename.clone(),
            lowest: ld.filename.clone(),
            analysis: format!(
                "{} scores {} ({}) and {} scores {} ({}), a spread of {} points.",
                hd.filename,
                ha.overall_risk_score,
                ha.risk_level.as_str(),
                ld.filename,
                la.overall_risk_score,
                la.risk_level.as_str(),
                ha.overall_risk_score - la.overall_risk_score,
            ),
        },
        _ => {
            let first = docs.first().map(|(d, _)| d.filename.clone()).unwrap_or_default();
            RiskComparison {
                highest: first.clone(),
                lowest: first,
                analysis: "None of the documents has been analysed yet.".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use legalease_common::models::{AnalysisStatus, Clause, ClausePosition};
    use uuid::Uuid;

    fn document(filename: &str) -> Document {
        Document {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            filename: filename.to_string(),
            original_text: String::new(),
            uploaded_at: Utc::now(),
            analysis_status: AnalysisStatus::Completed,
            analysis_error: None,
            analysis_result: None,
        }
    }

    fn analysis(score: u8, clauses: &[(&str, RiskLevel)]) -> DocumentAnalysis {
        DocumentAnalysis {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            overall_risk_score: score,
            risk_level: RiskLevel::from_score(score),
            clauses: clauses
                .iter()
                .map(|(category, level)| Clause {
                    id: Uuid::new_v4(),
                    text: format!("{} text", category),
                    category: category.to_string(),
                    risk_score: score,
                    risk_level: *level,
                    explanation: String::new(),
                    plain_language: String::new(),
                    analogy: None,
                    recommendations: vec![],
                    position: ClausePosition::default(),
                })
                .collect(),
            summary: String::new(),
            recommendations: vec![],
            analysis_time: 1,
            created_at: Utc::now(),
            model: "rule-based".to_string(),
        }
    }

    #[test]
    fn test_common_and_unique_categories() {
        let docs = vec![
            (
                document("a.txt"),
                Some(analysis(80, &[("Termination", RiskLevel::High), ("Payment", RiskLevel::Low)])),
            ),
            (
                document("b.txt"),
                Some(analysis(30, &[("Termination", RiskLevel::Low), ("Privacy", RiskLevel::Medium)])),
            ),
        ];
        let result = compare(&docs);

        assert_eq!(result.common_clauses.len(), 1);
        assert_eq!(result.common_clauses[0].clause, "Termination");
        assert_eq!(
            result.common_clauses[0].differences,
            vec!["a.txt: high risk".to_string(), "b.txt: low risk".to_string()]
        );
        assert_eq!(result.unique_clauses[0].clauses, vec!["Payment text".to_string()]);
        assert_eq!(result.unique_clauses[1].clauses, vec!["Privacy text".to_string()]);

        assert_eq!(result.risk_comparison.highest, "a.txt");
        assert_eq!(result.risk_comparison.lowest, "b.txt");
        assert!(result.risk_comparison.analysis.contains("spread of 50 points"));

        assert!(result.recommendations[0].contains("a.txt"));
        assert!(result.recommendations.iter().any(|r| r.contains("Align the Termination")));
        assert!(result.summary.starts_with("Compared 2 documents (2 analysed); 1 clause category"));
    }

    #[test]
    fn test_unanalysed_documents() {
        let docs = vec![(document("a.txt"), None), (document("b.txt"), None)];
        let result = compare(&docs);

        assert!(result.common_clauses.is_empty());
        assert!(result.unique_clauses.is_empty());
        assert_eq!(result.risk_comparison.highest, "a.txt");
        assert_eq!(result.recommendations.len(), 2);
    }

    #[test]
    fn test_similar_documents_get_default_recommendation() {
        let docs = vec![
            (document("a.txt"), Some(analysis(30, &[("Payment", RiskLevel::Low)]))),
            (document("b.txt"), Some(analysis(30, &[("Payment", RiskLevel::Low)]))),
        ];
        let result = compare(&docs);
        assert_eq!(result.recommendations.len(), 1);
        assert!(result.recommendations[0].contains("similar risk"));
    }
}
