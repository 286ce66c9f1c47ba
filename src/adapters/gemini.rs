use crate::config::ReasoningConfig;
use crate::domain::model::{Prompt, RawModelOutput};
use crate::domain::ports::{ReasoningError, ReasoningModel};
use crate::utils::error::{Result, TriageError};
use crate::utils::validation::validate_endpoint;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const DETAIL_CAP_CHARS: usize = 200;

/// Gemini `generateContent` client. One call per prompt, no retries.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiClient {
    /// Fails when no API key is configured: without credentials no decision can be produced.
    pub fn new(config: &ReasoningConfig) -> Result<Self> {
        let api_key = config
            .api_key()
            .ok_or_else(|| TriageError::MissingConfigError {
                field: "reasoning.api_key".to_string(),
            })?
            .to_string();
        validate_endpoint("reasoning.endpoint", &config.endpoint)?;

        let client = Client::builder().build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            timeout: config.timeout(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }

    fn timeout_error(&self) -> ReasoningError {
        ReasoningError::Timeout {
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }

    fn classify_request_error(&self, e: reqwest::Error) -> ReasoningError {
        if e.is_timeout() {
            self.timeout_error()
        } else {
            ReasoningError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl ReasoningModel for GeminiClient {
    async fn generate(&self, prompt: &Prompt) -> std::result::Result<RawModelOutput, ReasoningError> {
        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt.as_str() }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json"
            }
        });

        tracing::debug!("Sending generateContent request to model {}", self.model);

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify_request_error(e))?;

        let status = response.status();
        tracing::debug!("Gemini response status: {}", status);

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &detail));
        }

        let payload: GenerateContentResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.timeout_error()
            } else if e.is_decode() {
                ReasoningError::Upstream(format!("malformed response body: {}", e))
            } else {
                ReasoningError::Transport(e.to_string())
            }
        })?;

        payload.into_output()
    }
}

/// Auth and rate-limit rejections are transport problems; anything else non-2xx is the model side.
fn classify_status(status: StatusCode, detail: &str) -> ReasoningError {
    let detail: String = detail.trim().chars().take(DETAIL_CAP_CHARS).collect();
    let message = format!("HTTP {}: {}", status.as_u16(), detail);

    match status {
        StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::PROXY_AUTHENTICATION_REQUIRED
        | StatusCode::TOO_MANY_REQUESTS => ReasoningError::Transport(message),
        _ => ReasoningError::Upstream(message),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
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

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_output(self) -> std::result::Result<RawModelOutput, ReasoningError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ReasoningError::Upstream(format!("prompt blocked: {}", reason)));
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ReasoningError::Upstream("response contained no candidates".to_string()))?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ReasoningError::Upstream(format!(
                "candidate contained no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(RawModelOutput::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::FailureKind;
    use httpmock::prelude::*;

    const GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

    fn config(endpoint: String) -> ReasoningConfig {
        ReasoningConfig {
            endpoint,
            api_key: Some("test-key".to_string()),
            timeout_seconds: 2,
            ..ReasoningConfig::default()
        }
    }

    fn candidate_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
    }

    #[test]
    fn test_missing_api_key_fails_construction() {
        let config = ReasoningConfig::default();
        let err = GeminiClient::new(&config).err().unwrap();
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("reasoning.api_key"));
    }

    #[tokio::test]
    async fn test_generate_returns_candidate_text() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path(GENERATE_PATH)
                .header("x-goog-api-key", "test-key")
                .body_contains("Patient describes");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(candidate_body(r#"{"urgency_level": 3}"#));
        });

        let client = GeminiClient::new(&config(server.base_url())).unwrap();
        let output = client
            .generate(&Prompt::new("INPUT: Patient describes: sore throat"))
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(output.as_str(), r#"{"urgency_level": 3}"#);
    }

    #[tokio::test]
    async fn test_multiple_parts_are_joined() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(GENERATE_PATH);
            then.status(200).json_body(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "{\"a\":" }, { "text": " 1}" }] }
                }]
            }));
        });

        let client = GeminiClient::new(&config(server.base_url())).unwrap();
        let output = client.generate(&Prompt::new("p")).await.unwrap();
        assert_eq!(output.as_str(), "{\"a\": 1}");
    }

    #[tokio::test]
    async fn test_auth_and_rate_limit_are_transport_errors() {
        for status in [401, 403, 429] {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(POST).path(GENERATE_PATH);
                then.status(status).body("quota exceeded");
            });

            let client = GeminiClient::new(&config(server.base_url())).unwrap();
            let err = client.generate(&Prompt::new("p")).await.unwrap_err();
            assert_eq!(err.kind(), FailureKind::TransportError, "status {}", status);
        }
    }

    #[tokio::test]
    async fn test_server_errors_are_upstream_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(GENERATE_PATH);
            then.status(500).body("internal");
        });

        let client = GeminiClient::new(&config(server.base_url())).unwrap();
        let err = client.generate(&Prompt::new("p")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::UpstreamError);
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_blocked_prompt_and_empty_candidates_are_upstream_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(GENERATE_PATH);
            then.status(200)
                .json_body(serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
        });
        let client = GeminiClient::new(&config(server.base_url())).unwrap();
        let err = client.generate(&Prompt::new("p")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::UpstreamError);
        assert!(err.to_string().contains("SAFETY"));

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(GENERATE_PATH);
            then.status(200).json_body(serde_json::json!({
                "candidates": [{ "finishReason": "MAX_TOKENS" }]
            }));
        });
        let client = GeminiClient::new(&config(server.base_url())).unwrap();
        let err = client.generate(&Prompt::new("p")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::UpstreamError);
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_upstream_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(GENERATE_PATH);
            then.status(200).body("<html>gateway</html>");
        });

        let client = GeminiClient::new(&config(server.base_url())).unwrap();
        let err = client.generate(&Prompt::new("p")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::UpstreamError);
    }

    #[tokio::test]
    async fn test_slow_response_is_a_timeout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(GENERATE_PATH);
            then.status(200)
                .delay(Duration::from_millis(1500))
                .json_body(candidate_body("{}"));
        });

        let client = GeminiClient::new(&config(server.base_url()))
            .unwrap()
            .with_timeout(Duration::from_millis(200));
        let err = client.generate(&Prompt::new("p")).await.unwrap_err();
        assert_eq!(err, ReasoningError::Timeout { timeout_ms: 200 });
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // nothing listens on port 9 (discard) in test environments
        let client = GeminiClient::new(&config("http://127.0.0.1:9".to_string())).unwrap();
        let err = client.generate(&Prompt::new("p")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::TransportError);
    }
}
