//! Ollama generate API client.
//!
//! One non-streaming `/api/generate` call per word. The client does not retry;
//! a failed call is recorded against the row by the pipeline.

use crate::client::{TextGenerator, error_message};
use crate::models::{AnkisyncError, OllamaConfig, PromptTemplates, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const SERVICE: &str = "Ollama";

/// Generate request payload.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

/// Generate response.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama API client.
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a new Ollama client.
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AnkisyncError::Network)?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            timeout,
        })
    }

    fn build_request<'a>(&'a self, template: &str, word: &str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt: PromptTemplates::fill(template, word),
            stream: false,
        }
    }

    fn parse_response(body: &str) -> Result<String> {
        let parsed: GenerateResponse =
            serde_json::from_str(body).map_err(|e| AnkisyncError::InvalidResponse {
                service: SERVICE,
                message: e.to_string(),
            })?;

        if let Some(tokens) = parsed.eval_count {
            debug!(tokens, "Ollama generation finished");
        }

        parsed.response.ok_or_else(|| AnkisyncError::InvalidResponse {
            service: SERVICE,
            message: "missing 'response' field".to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, template: &str, word: &str) -> Result<String> {
        info!(word, model = %self.model, "Calling Ollama");
        let start = Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.build_request(template, word))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnkisyncError::Timeout(self.timeout)
                } else {
                    AnkisyncError::Network(e)
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(AnkisyncError::Network)?;

        if !status.is_success() {
            return Err(AnkisyncError::Api {
                service: SERVICE,
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let text = Self::parse_response(&body)?;
        debug!(
            word,
            elapsed_ms = start.elapsed().as_millis() as u64,
            chars = text.len(),
            "Generated explanation"
        );
        Ok(text)
    }
}
