//! Analyst backed by a generative model

use async_trait::async_trait;
use legalease_common::models::ClauseExplanation;
use tracing::debug;

use super::{parse, prompts, AiError, AnalysisDraft, Analyst, TextGenerator};

/// Drives a [`TextGenerator`] with the analysis prompts and validates replies
pub struct ModelAnalyst<G> {
    generator: G,
}

impl<G: TextGenerator> ModelAnalyst<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl<G: TextGenerator> Analyst for ModelAnalyst<G> {
    fn name(&self) -> &str {
        self.generator.model_name()
    }

    async fn analyze_document(&self, text: &str, filename: &str) -> Result<AnalysisDraft, AiError> {
        let reply = self
            .generator
            .generate(&prompts::document_analysis(text, filename))
            .await?;
        let draft = parse::parse_analysis(&reply, text, self.generator.model_name())?;
        debug!(
            filename = %filename,
            clauses = draft.clauses.len(),
            score = draft.overall_risk_score,
            "Model analysis parsed"
        );
        Ok(draft)
    }

    async fn explain_clause(&self, clause_text: &str) -> Result<ClauseExplanation, AiError> {
        let reply = self
            .generator
            .generate(&prompts::clause_explanation(clause_text))
            .await?;
        parse::parse_explanation(&reply)
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String, AiError> {
        let reply = self
            .generator
            .generate(&prompts::translation(text, target_language))
            .await?;
        let translated = reply.trim();
        if translated.is_empty() {
            return Err(AiError::EmptyResponse);
        }
        Ok(translated.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legalease_common::models::RiskLevel;
    use std::sync::Mutex;

    /// Replays a fixed reply and records prompts
    struct Canned {
        reply: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
    }

    impl Canned {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for Canned {
        fn model_name(&self) -> &str {
            "canned-model"
        }

        async fn generate(&self, prompt: &str) -> Result<String, AiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(|_| AiError::RateLimited)
        }
    }

    #[tokio::test]
    async fn test_analyze_document_parses_reply() {
        let text = "Either party may terminate without cause.";
        let reply = r#"{"overallRiskScore": 45, "summary": "Short.", "clauses": [
            {"text": "Either party may terminate without cause.", "category": "Termination",
             "riskScore": 45, "explanation": "Ends anytime.", "plainLanguage": "Anyone can quit."}
        ]}"#;
        let analyst = ModelAnalyst::new(Canned::ok(reply));

        let draft = analyst.analyze_document(text, "nda.txt").await.unwrap();

        assert_eq!(analyst.name(), "canned-model");
        assert_eq!(draft.model, "canned-model");
        assert_eq!(draft.risk_level, RiskLevel::Medium);
        assert_eq!(draft.clauses[0].position.start, 0);
        let prompts = analyst.generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("Document: nda.txt"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_invalid_response() {
        let analyst = ModelAnalyst::new(Canned::ok("I'm sorry, I can't do that."));
        let err = analyst.analyze_document("text", "a.txt").await.unwrap_err();
        assert!(matches!(err, AiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_generator_errors_propagate() {
        let analyst = ModelAnalyst::new(Canned::failing());
        assert!(matches!(
            analyst.explain_clause("x").await,
            Err(AiError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn test_translate_trims_reply() {
        let analyst = ModelAnalyst::new(Canned::ok("  Hola mundo \n"));
        let translated = analyst.translate("Hello world", "Spanish").await.unwrap();
        assert_eq!(translated, "Hola mundo");

        let blank = ModelAnalyst::new(Canned::ok("   "));
        assert!(matches!(
            blank.translate("Hello", "Spanish").await,
            Err(AiError::EmptyResponse)
        ));
    }
}
