use async_trait::async_trait;
use log::debug;

use crate::prompt::SummaryLength;
use crate::{Error, Result};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used for the lightweight key-validation request
pub const VALIDATION_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl GenerationConfig {
    pub fn summary(length: SummaryLength) -> Self {
        Self {
            max_output_tokens: if length == SummaryLength::Long { 1024 } else { 512 },
            temperature: 0.7,
        }
    }

    pub fn chat() -> Self {
        Self {
            max_output_tokens: 1024,
            temperature: 0.7,
        }
    }
}

/// A text-generation backend
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, api_key: &str, model_id: &str, prompt: &str, config: GenerationConfig) -> Result<String>;

    /// Cheap authenticated request proving `api_key` is usable.
    async fn validate_key(&self, api_key: &str, model_id: &str) -> Result<()>;
}

/// Gemini REST client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: API_BASE.to_string(),
        }
    }
}

// Prefer the API's own error message over the bare status line.
async fn failure_message(resp: reqwest::Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("Gemini API returned {status}: {body}"))
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, api_key: &str, model_id: &str, prompt: &str, config: GenerationConfig) -> Result<String> {
        debug!("Generating via Gemini model {model_id} ({} prompt chars)", prompt.len());

        let body = serde_json::json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }
            ],
            "generationConfig": {
                "maxOutputTokens": config.max_output_tokens,
                "temperature": config.temperature
            }
        });

        let resp = self
            .client
            .post(format!("{}/models/{model_id}:generateContent", self.base_url))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::GenerationFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::GenerationFailed(failure_message(resp).await));
        }

        let json: serde_json::Value = resp.json().await.map_err(|e| Error::GenerationFailed(e.to_string()))?;
        extract_text(&json)
    }

    async fn validate_key(&self, api_key: &str, model_id: &str) -> Result<()> {
        debug!("Validating API key against model {model_id}");

        let resp = self
            .client
            .get(format!("{}/models/{model_id}", self.base_url))
            .header("x-goog-api-key", api_key)
            .send()
            .await
            .map_err(|e| Error::ValidationFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::ValidationFailed(failure_message(resp).await));
        }
        Ok(())
    }
}

/// Pull the reply text out of a `generateContent` response.
///
/// The REST API only returns the reply under `candidates[].content.parts[]`,
/// whose text parts are joined with spaces. A top-level `text` field is only
/// present in payloads that were already flattened by an SDK or proxy; it is
/// preferred when it is non-empty.
pub fn extract_text(json: &serde_json::Value) -> Result<String> {
    let inline = json
        .get("text")
        .and_then(|t| t.as_str())
        .map(str::trim)
        .unwrap_or_default();
    if !inline.is_empty() {
        return Ok(inline.to_string());
    }

    let from_parts = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .map(|part| part.get("text").and_then(|t| t.as_str()).unwrap_or(""))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    let from_parts = from_parts.trim();
    if from_parts.is_empty() {
        return Err(Error::EmptyResponse);
    }
    Ok(from_parts.to_string())
}
