//! Legal-content detection for web page text
//!
//! The browser extension posts the visible text of a page; the response says
//! whether the page as a whole reads as a legal document and which blocks of
//! it are worth highlighting.

use serde::{Deserialize, Serialize};

use crate::ai::rule_based;

/// Phrases that mark text as legal
pub const LEGAL_KEYWORDS: &[&str] = &[
    "terms of service",
    "privacy policy",
    "user agreement",
    "license agreement",
    "terms and conditions",
    "end user license",
    "service agreement",
    "legal notice",
    "liability",
    "indemnify",
    "warranty",
    "disclaimer",
    "governing law",
    "arbitration",
    "jurisdiction",
    "intellectual property",
    "copyright",
    "trademark",
    "confidentiality",
    "non-disclosure",
    "termination",
];

/// Distinct keywords needed before a page counts as legal content
pub const PAGE_KEYWORD_THRESHOLD: usize = 3;

/// Blocks must be longer than this (in characters) to be highlighted
pub const MIN_SEGMENT_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalSegment {
    pub index: usize,
    /// Character offsets into the submitted text
    pub start: usize,
    pub end: usize,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub has_legal_content: bool,
    pub keywords: Vec<String>,
    pub segments: Vec<LegalSegment>,
    pub average_risk_score: u8,
}

fn keywords_in(lower: &str) -> Vec<String> {
    LEGAL_KEYWORDS
        .iter()
        .filter(|k| lower.contains(*k))
        .map(|k| k.to_string())
        .collect()
}

pub fn detect(text: &str) -> DetectionResult {
    let keywords = keywords_in(&text.to_lowercase());

    let mut segments = Vec::new();
    let mut scores: Vec<u32> = Vec::new();
    let mut char_pos = 0usize;

    for line in text.split('\n') {
        let line_chars = line.chars().count();
        let leading = line.chars().take_while(|c| c.is_whitespace()).count();
        let block = line.trim();
        let block_chars = block.chars().count();

        if block_chars > MIN_SEGMENT_CHARS {
            let found = keywords_in(&block.to_lowercase());
            if !found.is_empty() {
                if let Some(assessment) = rule_based::assess(block) {
                    scores.push(assessment.score as u32);
                }
                let start = char_pos + leading;
                segments.push(LegalSegment {
                    index: segments.len(),
                    start,
                    end: start + block_chars,
                    keywords: found,
                });
            }
        }

        // +1 for the newline consumed by split
        char_pos += line_chars + 1;
    }

    let average_risk_score = if scores.is_empty() {
        0
    } else {
        let total: u32 = scores.iter().sum();
        ((total as f64) / (scores.len() as f64)).round() as u8
    };

    DetectionResult {
        has_legal_content: keywords.len() >= PAGE_KEYWORD_THRESHOLD,
        keywords,
        segments,
        average_risk_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_needs_three_distinct_keywords() {
        let two = detect("See our Privacy Policy and Terms of Service. Privacy policy again.");
        assert_eq!(two.keywords, vec!["terms of service", "privacy policy"]);
        assert!(!two.has_legal_content);

        let three = detect("Privacy Policy, Terms of Service and a Disclaimer.");
        assert!(three.has_legal_content);
    }

    #[test]
    fn test_segments_need_length_and_keyword() {
        let text = "Welcome to the shop!\n\
                    \n\
                    \x20 The Company disclaims all liability for damages arising from use of the site.\n\
                    Short liability note.\n\
                    A long paragraph about shipping times and packaging choices for orders.";
        let result = detect(text);

        assert_eq!(result.segments.len(), 1);
        let seg = &result.segments[0];
        assert_eq!(seg.index, 0);
        assert_eq!(seg.keywords, vec!["liability"]);
        let expected_start = text.find("The Company").unwrap();
        assert_eq!(seg.start, expected_start);
        let sliced: String = text.chars().skip(seg.start).take(seg.end - seg.start).collect();
        assert!(sliced.ends_with("use of the site."));
        // Limitation of Liability base score, no modifiers
        assert_eq!(result.average_risk_score, 75);
    }

    #[test]
    fn test_empty_text() {
        let result = detect("");
        assert!(!result.has_legal_content);
        assert!(result.keywords.is_empty());
        assert!(result.segments.is_empty());
        assert_eq!(result.average_risk_score, 0);
    }

    #[test]
    fn test_offsets_count_characters() {
        let text = "Résumé ✓\nThis service agreement includes a warranty disclaimer for all users.";
        let result = detect(text);
        assert_eq!(result.segments[0].start, 9);
    }
}
