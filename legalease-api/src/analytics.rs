//! Per-user analytics over completed analyses

use chrono::{Duration, NaiveDate};
use legalease_common::models::{
    file_type, Activity, ActivityKind, AnalyticsData, CategoryStat, DocumentTypeStat, RiskLevel,
    RiskTrendPoint,
};
use std::collections::{BTreeMap, HashMap};

use crate::db::AnalyzedDocument;

pub const DEFAULT_TREND_DAYS: u32 = 7;
pub const MAX_TREND_DAYS: u32 = 90;
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

/// Clamp a requested trend window to 1..=MAX_TREND_DAYS
pub fn trend_days(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_TREND_DAYS)
        .clamp(1, MAX_TREND_DAYS)
}

fn rounded_mean(total: u64, count: usize) -> u64 {
    if count == 0 {
        0
    } else {
        (total as f64 / count as f64).round() as u64
    }
}

/// Aggregate analytics for one user's completed documents
///
/// `today` is the last day of the risk-trend window.
pub fn compute(docs: &[AnalyzedDocument], today: NaiveDate, days: u32) -> AnalyticsData {
    let total_documents = docs.len();

    let high_risk_clauses: usize = docs.iter().map(|d| d.analysis.high_risk_clauses()).sum();
    let risk_total: u64 = docs.iter().map(|d| d.analysis.overall_risk_score as u64).sum();
    let time_total: u64 = docs.iter().map(|d| d.analysis.analysis_time).sum();

    AnalyticsData {
        total_documents: total_documents as u32,
        high_risk_clauses: high_risk_clauses as u32,
        average_risk_score: rounded_mean(risk_total, total_documents) as u32,
        average_analysis_time: rounded_mean(time_total, total_documents),
        risk_trends: risk_trends(docs, today, days),
        clause_categories: clause_categories(docs),
        document_types: document_types(docs),
        recent_activity: recent_activity(docs),
    }
}

fn risk_trends(docs: &[AnalyzedDocument], today: NaiveDate, days: u32) -> Vec<RiskTrendPoint> {
    let first = today - Duration::days(days.saturating_sub(1) as i64);

    let mut by_day: BTreeMap<NaiveDate, RiskTrendPoint> = (0..days as i64)
        .map(|offset| {
            let date = first + Duration::days(offset);
            (
                date,
                RiskTrendPoint {
                    date: date.format("%Y-%m-%d").to_string(),
                    low: 0,
                    medium: 0,
                    high: 0,
                },
            )
        })
        .collect();

    for doc in docs {
        if let Some(point) = by_day.get_mut(&doc.analysis.created_at.date_naive()) {
            match doc.analysis.risk_level {
                RiskLevel::Low => point.low += 1,
                RiskLevel::Medium => point.medium += 1,
                RiskLevel::High => point.high += 1,
            }
        }
    }

    by_day.into_values().collect()
}

fn clause_categories(docs: &[AnalyzedDocument]) -> Vec<CategoryStat> {
    let mut stats: HashMap<&str, CategoryStat> = HashMap::new();

    for clause in docs.iter().flat_map(|d| d.analysis.clauses.iter()) {
        let entry = stats
            .entry(clause.category.as_str())
            .or_insert_with(|| CategoryStat {
                category: clause.category.clone(),
                count: 0,
                risk_level: clause.risk_level,
            });
        entry.count += 1;
        entry.risk_level = entry.risk_level.max(clause.risk_level);
    }

    let mut categories: Vec<CategoryStat> = stats.into_values().collect();
    categories.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    categories
}

fn document_types(docs: &[AnalyzedDocument]) -> Vec<DocumentTypeStat> {
    let mut totals: HashMap<String, (u32, u64)> = HashMap::new();

    for doc in docs {
        let entry = totals.entry(file_type(&doc.filename)).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += doc.analysis.overall_risk_score as u64;
    }

    let mut types: Vec<DocumentTypeStat> = totals
        .into_iter()
        .map(|(doc_type, (count, risk))| DocumentTypeStat {
            doc_type,
            count,
            average_risk: rounded_mean(risk, count as usize) as u8,
        })
        .collect();
    types.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.doc_type.cmp(&b.doc_type)));
    types
}

fn recent_activity(docs: &[AnalyzedDocument]) -> Vec<Activity> {
    let mut newest: Vec<&AnalyzedDocument> = docs.iter().collect();
    newest.sort_by(|a, b| b.analysis.created_at.cmp(&a.analysis.created_at));

    newest
        .into_iter()
        .take(RECENT_ACTIVITY_LIMIT)
        .map(|doc| Activity {
            id: doc.document_id,
            kind: ActivityKind::Analysis,
            document: doc.filename.clone(),
            timestamp: doc.analysis.created_at,
            risk_level: doc.analysis.risk_level,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use legalease_common::models::{Clause, ClausePosition, DocumentAnalysis};
    use uuid::Uuid;

    fn clause(category: &str, level: RiskLevel) -> Clause {
        Clause {
            id: Uuid::new_v4(),
            text: format!("{} clause", category),
            category: category.to_string(),
            risk_score: 50,
            risk_level: level,
            explanation: String::new(),
            plain_language: String::new(),
            analogy: None,
            recommendations: vec![],
            position: ClausePosition::default(),
        }
    }

    fn doc(filename: &str, score: u8, day: u32, hour: u32, clauses: Vec<Clause>) -> AnalyzedDocument {
        let document_id = Uuid::new_v4();
        let created_at = Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap();
        AnalyzedDocument {
            document_id,
            filename: filename.to_string(),
            uploaded_at: created_at,
            analysis: DocumentAnalysis {
                id: Uuid::new_v4(),
                document_id,
                overall_risk_score: score,
                risk_level: RiskLevel::from_score(score),
                clauses,
                summary: String::new(),
                recommendations: vec![],
                analysis_time: 1000 + score as u64,
                created_at,
                model: "rule-based".to_string(),
            },
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn test_empty_input_is_zeroed() {
        let data = compute(&[], today(), 7);
        assert_eq!(data.total_documents, 0);
        assert_eq!(data.average_risk_score, 0);
        assert_eq!(data.average_analysis_time, 0);
        assert_eq!(data.risk_trends.len(), 7);
        assert!(data.risk_trends.iter().all(|p| p.low + p.medium + p.high == 0));
        assert!(data.clause_categories.is_empty());
        assert!(data.recent_activity.is_empty());
    }

    #[test]
    fn test_totals_and_averages() {
        let docs = vec![
            doc("a.txt", 80, 9, 10, vec![clause("Liability", RiskLevel::High), clause("Payment", RiskLevel::Low)]),
            doc("b.txt", 35, 10, 9, vec![clause("Liability", RiskLevel::Medium)]),
        ];
        let data = compute(&docs, today(), 7);

        assert_eq!(data.total_documents, 2);
        assert_eq!(data.high_risk_clauses, 1);
        // (80 + 35) / 2 = 57.5
        assert_eq!(data.average_risk_score, 58);
        assert_eq!(data.average_analysis_time, 1058);
    }

    #[test]
    fn test_risk_trends_zero_filled_by_day() {
        let docs = vec![
            doc("a.txt", 80, 9, 10, vec![]),
            doc("b.txt", 35, 10, 9, vec![]),
            doc("c.txt", 20, 10, 11, vec![]),
            doc("old.txt", 90, 1, 0, vec![]),
        ];
        let trends = compute(&docs, today(), 3).risk_trends;

        let dates: Vec<&str> = trends.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-08", "2024-03-09", "2024-03-10"]);
        assert_eq!((trends[0].low, trends[0].medium, trends[0].high), (0, 0, 0));
        assert_eq!(trends[1].high, 1);
        assert_eq!(trends[2].low, 2);
    }

    #[test]
    fn test_categories_take_highest_level_and_sort() {
        let docs = vec![
            doc("a.txt", 50, 10, 1, vec![
                clause("Termination", RiskLevel::High),
                clause("Payment", RiskLevel::Low),
                clause("Privacy", RiskLevel::Medium),
            ]),
            doc("b.txt", 50, 10, 2, vec![
                clause("Termination", RiskLevel::Low),
                clause("Payment", RiskLevel::Medium),
            ]),
        ];
        let categories = compute(&docs, today(), 7).clause_categories;

        let summary: Vec<(&str, u32, RiskLevel)> = categories
            .iter()
            .map(|c| (c.category.as_str(), c.count, c.risk_level))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Payment", 2, RiskLevel::Medium),
                ("Termination", 2, RiskLevel::High),
                ("Privacy", 1, RiskLevel::Medium),
            ]
        );
    }

    #[test]
    fn test_document_types_by_extension() {
        let docs = vec![
            doc("Lease.TXT", 40, 10, 1, vec![]),
            doc("nda.txt", 61, 10, 2, vec![]),
            doc("README", 10, 10, 3, vec![]),
        ];
        let types = compute(&docs, today(), 7).document_types;

        assert_eq!(types[0].doc_type, "txt");
        assert_eq!(types[0].count, 2);
        assert_eq!(types[0].average_risk, 51);
        assert_eq!(types[1].doc_type, "unknown");
    }

    #[test]
    fn test_recent_activity_newest_first_capped() {
        let docs: Vec<AnalyzedDocument> = (1..=7).map(|d| doc(&format!("{}.txt", d), 30, d, 0, vec![])).collect();
        let activity = compute(&docs, today(), 7).recent_activity;

        assert_eq!(activity.len(), RECENT_ACTIVITY_LIMIT);
        assert_eq!(activity[0].document, "7.txt");
        assert_eq!(activity[4].document, "3.txt");
        assert_eq!(activity[0].kind, ActivityKind::Analysis);
        assert_eq!(activity[0].id, docs[6].document_id);
    }

    #[test]
    fn test_trend_days_clamped() {
        assert_eq!(trend_days(None), 7);
        assert_eq!(trend_days(Some(0)), 1);
        assert_eq!(trend_days(Some(365)), 90);
    }
}
