//! OpenAI-Compatible Backend
//!
//! Client for an OpenAI-compatible `/chat/completions` endpoint with bearer
//! token authentication. The response is consumed at
//! `choices[0].message.content`; absence of that path is a hard failure of
//! the call (the orchestrator decides what to do with it).

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::traits::{ChatBackend, CompletionRequest, CompletionResponse};

/// OpenAI-compatible backend client
#[derive(Clone)]
pub struct OpenAiBackend {
    /// API base URL, e.g. `https://llm.example.com/v1`
    base_url: String,
    /// Bearer token
    api_key: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl OpenAiBackend {
    /// Create a new backend client
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Create from environment variables
    ///
    /// Reads `EDUPORT_MODEL_API_BASE` and `EDUPORT_MODEL_API_KEY`.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = std::env::var("EDUPORT_MODEL_API_BASE")
            .unwrap_or_else(|_| "https://llm.chutes.ai/v1".to_string());
        let api_key = std::env::var("EDUPORT_MODEL_API_KEY").unwrap_or_default();
        Self::new(base_url, api_key)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.base_url)
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(self.models_url())
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok()
    }

    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<CompletionResponse> {
        let start = Instant::now();

        let response = self
            .http_client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("model provider returned {status}: {body}");
        }

        let data: serde_json::Value = response.json().await?;

        let content = data
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| anyhow::anyhow!("response payload missing message content"))?
            .to_string();

        Ok(CompletionResponse {
            content,
            model: request.model.clone(),
            duration_ms: Some(start.elapsed().as_millis() as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_urls() {
        let backend = OpenAiBackend::new("https://llm.example.com/v1/", "key");
        assert_eq!(
            backend.completions_url(),
            "https://llm.example.com/v1/chat/completions"
        );
        assert_eq!(backend.models_url(), "https://llm.example.com/v1/models");
    }
}
