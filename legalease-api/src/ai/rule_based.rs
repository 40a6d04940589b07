//! Offline keyword analyst
//!
//! Used when no model API key is configured. Deterministic: the same text
//! always yields the same clauses and scores, which also makes it the analyst
//! of choice in tests.

use async_trait::async_trait;
use legalease_common::models::{Clause, ClauseExplanation, RiskLevel};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::parse::locate;
use super::{AiError, AnalysisDraft, Analyst};

pub const ANALYST_NAME: &str = "rule-based";

const MAX_CLAUSES: usize = 25;
const MIN_SEGMENT_CHARS: usize = 20;
const LONG_LINE_CHARS: usize = 400;
const GENERAL_SCORE: u8 = 25;
const MIN_SCORE: i32 = 5;
const MAX_SCORE: i32 = 95;

struct CategoryRule {
    name: &'static str,
    keywords: &'static [&'static str],
    base_score: u8,
    explanation: &'static str,
    plain_language: &'static str,
    analogy: &'static str,
    recommendation: &'static str,
}

const RULES: &[CategoryRule] = &[
    CategoryRule {
        name: "Indemnification",
        keywords: &["indemnify", "indemnification", "hold harmless", "defend and"],
        base_score: 85,
        explanation: "An indemnification clause makes one party cover the other's losses, \
                      claims and legal costs arising from the described events.",
        plain_language: "If someone sues them over something connected to you, you pay.",
        analogy: "Like borrowing a friend's car and agreeing to pay for any accident, \
                  even one that was not entirely your fault.",
        recommendation: "Limit the indemnity to claims caused by your own breach or negligence.",
    },
    CategoryRule {
        name: "Dispute Resolution",
        keywords: &["arbitration", "arbitrator", "class action", "jury trial", "dispute"],
        base_score: 80,
        explanation: "A dispute resolution clause decides where and how disagreements are \
                      settled, often replacing court proceedings with private arbitration.",
        plain_language: "You may give up the right to take them to court or join a group lawsuit.",
        analogy: "Like agreeing in advance that any argument will be settled by a referee \
                  the other side picked.",
        recommendation: "Check for an opt-out window from arbitration and class action waivers.",
    },
    CategoryRule {
        name: "Limitation of Liability",
        keywords: &["liability", "liable", "damages", "consequential"],
        base_score: 75,
        explanation: "A limitation of liability clause caps or excludes what one party owes \
                      the other when something goes wrong.",
        plain_language: "If they cause you a loss, the most you can get back may be very little.",
        analogy: "Like a parking garage sign saying it is not responsible for damage to your car.",
        recommendation: "Ask for the cap to exclude gross negligence and data breaches.",
    },
    CategoryRule {
        name: "Auto-Renewal",
        keywords: &["automatically renew", "auto-renew", "automatic renewal", "renewal term"],
        base_score: 65,
        explanation: "An auto-renewal clause extends the agreement for another term unless \
                      it is cancelled before a deadline.",
        plain_language: "The contract keeps going and billing unless you cancel in time.",
        analogy: "Like a gym membership that renews every year unless you remember to cancel.",
        recommendation: "Note the cancellation deadline and ask for a renewal reminder.",
    },
    CategoryRule {
        name: "Termination",
        keywords: &["terminate", "termination", "cancel", "suspend"],
        base_score: 60,
        explanation: "A termination clause sets out when and how the agreement can be ended \
                      and what happens afterwards.",
        plain_language: "This explains how either side can end the deal, and what notice is needed.",
        analogy: "Like a landlord who can ask you to move out with a month's notice.",
        recommendation: "Make sure termination rights and notice periods apply to both sides.",
    },
    CategoryRule {
        name: "Modification",
        keywords: &["modify", "amend", "change these terms", "changes to"],
        base_score: 60,
        explanation: "A modification clause lets the terms be changed after you agree to them.",
        plain_language: "They can change the rules later, sometimes without asking you.",
        analogy: "Like a board game where one player may rewrite the rules mid-game.",
        recommendation: "Ask for advance written notice of changes and a right to exit.",
    },
    CategoryRule {
        name: "Privacy",
        keywords: &["personal data", "personal information", "privacy", "cookies", "share your"],
        base_score: 55,
        explanation: "A privacy clause describes what personal data is collected, how it is \
                      used and who it is shared with.",
        plain_language: "This covers what they learn about you and who else gets to see it.",
        analogy: "Like handing over your diary and agreeing on who may read it.",
        recommendation: "Check which third parties receive your data and how to opt out.",
    },
    CategoryRule {
        name: "Warranty",
        keywords: &["warranty", "warranties", "as is", "disclaim"],
        base_score: 55,
        explanation: "A warranty clause states what is promised about quality or fitness, \
                      or disclaims such promises.",
        plain_language: "They may not promise that the product or service will actually work.",
        analogy: "Like buying a used car sold as-is with no guarantee it will start tomorrow.",
        recommendation: "Ask for a minimum performance warranty or a refund remedy.",
    },
    CategoryRule {
        name: "Payment",
        keywords: &["payment", "fees", "fee ", "invoice", "refund", "price"],
        base_score: 50,
        explanation: "A payment clause sets amounts, due dates, refunds and penalties for \
                      late payment.",
        plain_language: "This says what you pay, when you pay it, and what happens if you are late.",
        analogy: "Like a phone plan's fine print about late fees and price increases.",
        recommendation: "Confirm how prices can change and whether refunds are available.",
    },
    CategoryRule {
        name: "Intellectual Property",
        keywords: &["intellectual property", "copyright", "trademark", "license", "ownership"],
        base_score: 50,
        explanation: "An intellectual property clause decides who owns or may use content, \
                      inventions and brands created or shared under the agreement.",
        plain_language: "This decides who owns what you create or upload.",
        analogy: "Like a photo contest where entering means the organiser can use your photo.",
        recommendation: "Keep ownership of your own content and limit the licence you grant.",
    },
    CategoryRule {
        name: "Confidentiality",
        keywords: &["confidential", "non-disclosure", "trade secret"],
        base_score: 45,
        explanation: "A confidentiality clause restricts sharing information disclosed under \
                      the agreement.",
        plain_language: "You must keep certain information secret, possibly for a long time.",
        analogy: "Like a promise not to tell anyone a friend's secret, with penalties if you do.",
        recommendation: "Check how long the obligation lasts and what counts as confidential.",
    },
    CategoryRule {
        name: "Governing Law",
        keywords: &["governing law", "governed by", "jurisdiction", "venue"],
        base_score: 35,
        explanation: "A governing law clause picks which jurisdiction's laws apply and where \
                      disputes are heard.",
        plain_language: "Any dispute follows the laws of a place they chose, possibly far from you.",
        analogy: "Like agreeing that any argument will be settled in the other team's stadium.",
        recommendation: "Prefer the law and courts of your own home jurisdiction.",
    },
];

const GENERAL_EXPLANATION: &str =
    "A general provision that sets out obligations or definitions without an obvious risk pattern.";
const GENERAL_PLAIN: &str = "A standard term. Read it, but it is unlikely to surprise you.";
const GENERAL_ANALOGY: &str = "Like the small print on a ticket that mostly restates the obvious.";

/// Phrases that push a clause's risk up or down
const RISK_MODIFIERS: &[(&str, i32)] = &[
    ("without notice", 10),
    ("sole discretion", 10),
    ("irrevocable", 10),
    ("perpetual", 5),
    ("without cause", 5),
    ("mutual", -10),
    ("reasonable", -5),
    ("written notice", -5),
];

/// Category and score the rules assign to a piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    pub category: &'static str,
    pub score: u8,
}

fn best_rule(lower: &str) -> Option<&'static CategoryRule> {
    RULES
        .iter()
        .map(|rule| {
            let hits = rule.keywords.iter().filter(|k| lower.contains(*k)).count();
            (rule, hits)
        })
        .filter(|(_, hits)| *hits > 0)
        // Most keyword hits wins; earlier (riskier) rules win ties
        .fold(None, |best: Option<(&CategoryRule, usize)>, (rule, hits)| match best {
            Some((_, best_hits)) if best_hits >= hits => best,
            _ => Some((rule, hits)),
        })
        .map(|(rule, _)| rule)
}

fn modifier_total(lower: &str) -> i32 {
    RISK_MODIFIERS
        .iter()
        .filter(|(phrase, _)| lower.contains(phrase))
        .map(|(_, delta)| delta)
        .sum()
}

/// Classify and score text, `None` when no category keyword occurs
pub fn assess(text: &str) -> Option<Assessment> {
    let lower = text.to_lowercase();
    let rule = best_rule(&lower)?;
    let score = (rule.base_score as i32 + modifier_total(&lower)).clamp(MIN_SCORE, MAX_SCORE);
    Some(Assessment {
        category: rule.name,
        score: score as u8,
    })
}

fn split_sentences(line: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        let terminal = matches!(b, b'.' | b';' | b'?' | b'!');
        let boundary = bytes.get(i + 1).map_or(true, |next| next.is_ascii_whitespace());
        if terminal && boundary {
            pieces.push(&line[start..=i]);
            start = i + 1;
        }
    }
    if start < line.len() {
        pieces.push(&line[start..]);
    }
    pieces
}

/// Candidate clauses: non-empty lines, with long lines split into sentences
pub fn segments(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .flat_map(|line| {
            if line.chars().count() > LONG_LINE_CHARS {
                split_sentences(line)
            } else {
                vec![line]
            }
        })
        .map(str::trim)
        .filter(|s| s.chars().count() >= MIN_SEGMENT_CHARS)
        .collect()
}

fn clause_recommendations(rule: Option<&CategoryRule>, lower: &str) -> Vec<String> {
    let mut recs = Vec::new();
    if let Some(rule) = rule {
        recs.push(rule.recommendation.to_string());
    }
    if lower.contains("sole discretion") {
        recs.push("Ask for objective criteria instead of the other party's sole discretion.".to_string());
    }
    if lower.contains("without notice") {
        recs.push("Request a written notice period before this can take effect.".to_string());
    }
    if lower.contains("irrevocable") || lower.contains("perpetual") {
        recs.push("Negotiate a time limit or a right to revoke.".to_string());
    }
    recs
}

fn build_clause(text: &str, original: &str, cursor: &mut usize, general: bool) -> Clause {
    let lower = text.to_lowercase();
    let rule = if general { None } else { best_rule(&lower) };
    let score = match rule {
        Some(rule) => (rule.base_score as i32 + modifier_total(&lower)).clamp(MIN_SCORE, MAX_SCORE) as u8,
        None => GENERAL_SCORE,
    };
    let position = match locate(original, text, *cursor) {
        Some((position, next)) => {
            *cursor = next;
            position
        }
        None => Default::default(),
    };
    Clause {
        id: Uuid::new_v4(),
        text: text.to_string(),
        category: rule.map_or("General", |r| r.name).to_string(),
        risk_score: score,
        risk_level: RiskLevel::from_score(score),
        explanation: rule.map_or(GENERAL_EXPLANATION, |r| r.explanation).to_string(),
        plain_language: rule.map_or(GENERAL_PLAIN, |r| r.plain_language).to_string(),
        analogy: Some(rule.map_or(GENERAL_ANALOGY, |r| r.analogy).to_string()),
        recommendations: clause_recommendations(rule, &lower),
        position,
    }
}

/// Weighted toward the riskiest clause: 0.6 x max + 0.4 x mean
pub fn overall_score(scores: &[u8]) -> u8 {
    if scores.is_empty() {
        return 0;
    }
    let max = scores.iter().copied().max().unwrap_or(0) as f64;
    let mean = scores.iter().map(|s| *s as f64).sum::<f64>() / scores.len() as f64;
    (0.6 * max + 0.4 * mean).round().clamp(0.0, 100.0) as u8
}

fn summarize(filename: &str, clauses: &[Clause]) -> String {
    if clauses.is_empty() {
        return format!("{} contains no recognisable clauses.", filename);
    }
    let categories: BTreeSet<&str> = clauses.iter().map(|c| c.category.as_str()).collect();
    let high = clauses
        .iter()
        .filter(|c| c.risk_level == RiskLevel::High)
        .count();
    let mut summary = format!(
        "{} contains {} notable clause{} across {} categor{}.",
        filename,
        clauses.len(),
        if clauses.len() == 1 { "" } else { "s" },
        categories.len(),
        if categories.len() == 1 { "y" } else { "ies" },
    );
    if let Some(riskiest) = clauses.iter().max_by_key(|c| c.risk_score) {
        if high > 0 {
            summary.push_str(&format!(
                " {} {} high risk; the riskiest is a {} clause.",
                high,
                if high == 1 { "is" } else { "are" },
                riskiest.category
            ));
        } else {
            summary.push_str(" None of them is high risk.");
        }
    }
    summary
}

fn document_recommendations(clauses: &[Clause]) -> Vec<String> {
    let mut recs: Vec<String> = Vec::new();
    for clause in clauses.iter().filter(|c| c.risk_level == RiskLevel::High) {
        if let Some(first) = clause.recommendations.first() {
            if !recs.contains(first) {
                recs.push(first.clone());
            }
        }
    }
    if recs.is_empty() {
        recs.push("No high-risk clauses found; review the medium-risk items before signing.".to_string());
    } else {
        recs.push("Have a qualified lawyer review the high-risk clauses before signing.".to_string());
    }
    recs
}

/// Keyword-rule analyst
#[derive(Debug, Default, Clone)]
pub struct RuleBasedAnalyst;

impl RuleBasedAnalyst {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of `analyze_document`
    pub fn analyze(&self, text: &str, filename: &str) -> AnalysisDraft {
        let segments = segments(text);
        let matched: Vec<&str> = segments
            .iter()
            .copied()
            .filter(|s| best_rule(&s.to_lowercase()).is_some())
            .take(MAX_CLAUSES)
            .collect();
        let general = matched.is_empty();
        let chosen: Vec<&str> = if general {
            segments.into_iter().take(3).collect()
        } else {
            matched
        };

        let mut cursor = 0;
        let clauses: Vec<Clause> = chosen
            .into_iter()
            .map(|s| build_clause(s, text, &mut cursor, general))
            .collect();

        let scores: Vec<u8> = clauses.iter().map(|c| c.risk_score).collect();
        let overall = overall_score(&scores);

        AnalysisDraft {
            overall_risk_score: overall,
            risk_level: RiskLevel::from_score(overall),
            summary: summarize(filename, &clauses),
            recommendations: document_recommendations(&clauses),
            clauses,
            model: ANALYST_NAME.to_string(),
        }
    }

    pub fn explain(&self, clause_text: &str) -> ClauseExplanation {
        let lower = clause_text.to_lowercase();
        let rule = best_rule(&lower);
        let mut risks: Vec<String> = RISK_MODIFIERS
            .iter()
            .filter(|(phrase, delta)| *delta > 0 && lower.contains(phrase))
            .map(|(phrase, _)| format!("Contains \"{}\"", phrase))
            .collect();
        if let Some(rule) = rule {
            risks.insert(0, format!("{} clauses can shift risk to you", rule.name));
        }
        ClauseExplanation {
            explanation: rule.map_or(GENERAL_EXPLANATION, |r| r.explanation).to_string(),
            plain_language: rule.map_or(GENERAL_PLAIN, |r| r.plain_language).to_string(),
            analogy: rule.map_or(GENERAL_ANALOGY, |r| r.analogy).to_string(),
            risks,
        }
    }
}

#[async_trait]
impl Analyst for RuleBasedAnalyst {
    fn name(&self) -> &str {
        ANALYST_NAME
    }

    async fn analyze_document(&self, text: &str, filename: &str) -> Result<AnalysisDraft, AiError> {
        Ok(self.analyze(text, filename))
    }

    async fn explain_clause(&self, clause_text: &str) -> Result<ClauseExplanation, AiError> {
        Ok(self.explain(clause_text))
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String, AiError> {
        Ok(format!("[{}] {}", target_language.trim(), text))
    }
}
