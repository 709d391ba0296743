//! Generative model clients

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    config::ChatConfig,
    error::{AppError, AppResult},
};

/// Text-in, text-out language model
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> AppResult<String>;
}

/// Build the configured model, or the offline one when no API key is set
pub fn from_config(config: &ChatConfig) -> AppResult<std::sync::Arc<dyn LanguageModel>> {
    match config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) => Ok(std::sync::Arc::new(GeminiClient::new(config, key)?)),
        None => {
            tracing::warn!("No chat API key configured, assistant will answer with its fallback message");
            Ok(std::sync::Arc::new(OfflineModel))
        }
    }
}

/// Google Generative Language `generateContent` client
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(config: &ChatConfig, api_key: &str) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Model request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!("Model returned HTTP {}", status)));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Unreadable model response: {}", e)))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AppError::Upstream("Model returned no text".to_string()));
        }
        Ok(text)
    }
}

/// Model used when no API key is configured; always fails
pub struct OfflineModel;

#[async_trait]
impl LanguageModel for OfflineModel {
    async fn generate(&self, _prompt: &str) -> AppResult<String> {
        Err(AppError::Upstream("Language model is not configured".to_string()))
    }
}
