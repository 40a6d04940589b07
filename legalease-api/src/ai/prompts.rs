//! Prompt templates for the generative model

/// Longest document text sent to the model, in characters
pub const MAX_PROMPT_CHARS: usize = 200_000;

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

pub fn document_analysis(text: &str, filename: &str) -> String {
    format!(
        r#"You are a legal analyst. Review the legal document below and break it into its clauses.

Document: {filename}
Content:
{content}

Respond with a single JSON object and nothing else, in this shape:
{{
  "overallRiskScore": number (0-100),
  "riskLevel": "low" | "medium" | "high",
  "summary": "short summary of the document",
  "recommendations": ["recommendation"],
  "clauses": [
    {{
      "text": "exact clause text as it appears in the document",
      "category": "category name, e.g. Termination, Liability, Payment",
      "riskScore": number (0-100),
      "riskLevel": "low" | "medium" | "high",
      "explanation": "detailed legal explanation",
      "plainLanguage": "the same point in everyday language",
      "analogy": "a short real-world analogy",
      "recommendations": ["what the reader should do about it"],
      "position": {{"start": number, "end": number}}
    }}
  ]
}}

Focus on clauses that shift risk to the reader, explain legal terms plainly,
score risk consistently and keep recommendations practical."#,
        filename = filename,
        content = truncate_chars(text, MAX_PROMPT_CHARS),
    )
}

pub fn clause_explanation(clause_text: &str) -> String {
    format!(
        r#"Explain this legal clause:
"{clause}"

Respond with a single JSON object and nothing else:
{{
  "explanation": "detailed legal explanation",
  "plainLanguage": "simple, everyday explanation",
  "analogy": "real-world analogy",
  "risks": ["potential risk"]
}}"#,
        clause = clause_text.trim(),
    )
}

pub fn translation(text: &str, target_language: &str) -> String {
    format!(
        "Translate the following text to {language}. Keep the legal meaning exact and \
         reply with the translation only.\n\n{text}",
        language = target_language.trim(),
        text = text,
    )
}
