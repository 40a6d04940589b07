//! Gemini `generateContent` client
//!
//! API Documentation: https://ai.google.dev/api/generate-content

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

use super::{AiError, TextGenerator};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Gemini API client
///
/// Requests are paced by a token bucket of `requests_per_minute`; callers
/// wait for a permit rather than being rejected.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        requests_per_minute: u32,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        if api_key.trim().is_empty() {
            return Err(AiError::InvalidApiKey);
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AiError::Network(format!("Failed to build HTTP client: {}", e)))?;

        let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            rate_limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Concatenated text parts of the first candidate
fn first_candidate_text(response: GenerateResponse) -> Result<String, AiError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(AiError::EmptyResponse)
    } else {
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        self.rate_limiter.until_ready().await;

        debug!(model = %self.model, prompt_chars = prompt.len(), "Calling Gemini");

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0.2 }
        });

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AiError::Timeout(self.timeout)
                } else {
                    AiError::Network(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(AiError::InvalidApiKey),
            StatusCode::TOO_MANY_REQUESTS => return Err(AiError::RateLimited),
            s if !s.is_success() => {
                let detail = response.text().await.unwrap_or_default();
                return Err(AiError::Api(s.as_u16(), detail));
            }
            _ => {}
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(e.without_url().to_string()))?;

        first_candidate_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(key: &str) -> Result<GeminiClient, AiError> {
        GeminiClient::new(
            key.to_string(),
            "gemini-1.5-pro".to_string(),
            "https://example.invalid/v1beta/".to_string(),
            60,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_blank_key_rejected() {
        assert!(matches!(client("  "), Err(AiError::InvalidApiKey)));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let c = client("k").unwrap();
        assert_eq!(
            c.endpoint(),
            "https://example.invalid/v1beta/models/gemini-1.5-pro:generateContent"
        );
        assert_eq!(c.model_name(), "gemini-1.5-pro");
    }

    #[test]
    fn test_zero_rate_is_accepted() {
        let c = GeminiClient::new(
            "k".to_string(),
            "m".to_string(),
            "http://localhost".to_string(),
            0,
            Duration::from_secs(1),
        );
        assert!(c.is_ok());
    }

    #[test]
    fn test_first_candidate_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }))
        .unwrap();
        assert_eq!(first_candidate_text(response).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_no_candidates_is_empty_response() {
        let response: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            first_candidate_text(response),
            Err(AiError::EmptyResponse)
        ));
    }
}
