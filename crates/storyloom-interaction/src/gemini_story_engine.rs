//! GeminiStoryEngine - Gemini REST API backend for story generation.
//!
//! Prompts are rendered by [`PromptRenderer`]; the raw reply text is returned
//! untouched for the recovery pipeline to parse.

use crate::prompts::PromptRenderer;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use storyloom_core::config::GeminiSettings;
use storyloom_core::engine::{ContinuationRequest, EndingRequest, OpeningRequest, StoryEngine};
use storyloom_core::error::{Result, StoryError};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// StoryEngine implementation that talks to the Gemini HTTP API.
pub struct GeminiStoryEngine {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    prompts: PromptRenderer,
}

impl GeminiStoryEngine {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: BASE_URL.to_string(),
            prompts: PromptRenderer::new()?,
        })
    }

    /// Builds an engine from configuration, using `api_key` resolved by the caller.
    pub fn from_settings(settings: &GeminiSettings, api_key: impl Into<String>) -> Result<Self> {
        let model = if settings.model.trim().is_empty() {
            DEFAULT_GEMINI_MODEL
        } else {
            settings.model.as_str()
        };
        Self::new(api_key, model)
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Points the engine at a different API root, e.g. a local proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{model}:generateContent",
            self.base_url.trim_end_matches('/'),
            model = self.model
        )
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part { text: prompt }],
            }],
        };

        tracing::debug!(model = %self.model, "[GeminiStoryEngine] Sending generateContent request");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|err| StoryError::network(format!("Gemini API request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            let err = map_http_error(status, &body_text);
            tracing::warn!(
                status = status.as_u16(),
                error = %err,
                "[GeminiStoryEngine] Request rejected"
            );
            return Err(err);
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            StoryError::network(format!("Failed to parse Gemini response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl StoryEngine for GeminiStoryEngine {
    async fn generate_opening(&self, request: &OpeningRequest) -> Result<String> {
        self.generate(self.prompts.opening(request)?).await
    }

    async fn continue_story(&self, request: &ContinuationRequest) -> Result<String> {
        self.generate(self.prompts.continuation(request)?).await
    }

    async fn generate_ending(&self, request: &EndingRequest) -> Result<String> {
        self.generate(self.prompts.ending(request)?).await
    }

    async fn generate_customization_questions(
        &self,
        title: &str,
        description: &str,
    ) -> Result<String> {
        self.generate(self.prompts.customization_questions(title, description)?)
            .await
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .flatten()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(StoryError::network(
            "Gemini API returned no text in the response candidates",
        ));
    }
    Ok(text)
}

fn map_http_error(status: StatusCode, body: &str) -> StoryError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    StoryError::http(status.as_u16(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> GenerateContentResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_extracts_and_joins_candidate_parts() {
        let response = parse(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"{\"story\":"},{"text":"\"Hi\"}"}]}}]}"#,
        );
        assert_eq!(extract_text_response(response).unwrap(), r#"{"story":"Hi"}"#);
    }

    #[test]
    fn test_missing_text_is_a_transient_failure() {
        for body in [
            r#"{}"#,
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{"finishReason":"SAFETY"}]}"#,
            r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#,
        ] {
            let err = extract_text_response(parse(body)).unwrap_err();
            assert!(err.is_transient(), "{body}");
        }
    }

    #[test]
    fn test_http_error_keeps_status_and_api_message() {
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#,
        );
        match err {
            StoryError::TransientNetwork { status, message } => {
                assert_eq!(status, Some(429));
                assert_eq!(message, "RESOURCE_EXHAUSTED: Quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let plain = map_http_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(plain.to_string().contains("upstream down"));
    }

    #[test]
    fn test_endpoint_uses_configured_model() {
        let settings = GeminiSettings {
            model: "gemini-2.5-pro".to_string(),
            ..GeminiSettings::default()
        };
        let engine = GeminiStoryEngine::from_settings(&settings, "key")
            .unwrap()
            .with_base_url("http://localhost:8080/models/");
        assert_eq!(engine.model(), "gemini-2.5-pro");
        assert_eq!(
            engine.endpoint(),
            "http://localhost:8080/models/gemini-2.5-pro:generateContent"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: "Tell a story".to_string(),
                }],
            }],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"contents":[{"role":"user","parts":[{"text":"Tell a story"}]}]})
        );
    }
}
