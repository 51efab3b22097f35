//! Ollama HTTP client for assistant queries
//!
//! Talks to a local Ollama server (default localhost:11434) through the
//! `/api/generate` endpoint. Screenshots are attached base64-encoded in the
//! `images` field so multimodal models can answer questions about the screen.
//! Transient failures are retried with exponential backoff.

use super::{Assistant, AssistantError, Screenshot};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::time::sleep;

/// Default Ollama server address
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Default model; needs vision support for screenshot questions
pub const DEFAULT_MODEL: &str = "llava";

/// Default timeout for API requests in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum number of retry attempts
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff in milliseconds
const BASE_RETRY_DELAY_MS: u64 = 100;

const SYSTEM_PROMPT: &str = "You are a concise desktop assistant. The user is controlling \
their computer hands-free and your answer will be typed into the focused window. \
Answer in plain text without markdown. If a screenshot is attached, it shows the \
user's current screen.";

/// Request body for Ollama generate endpoint
#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
    stream: bool,
}

/// Response from Ollama generate endpoint (non-streaming)
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Error types for Ollama operations
#[derive(Debug, thiserror::Error)]
pub enum OllamaError {
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("All {attempts} retry attempts failed: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl OllamaError {
    fn is_retryable(&self) -> bool {
        match self {
            OllamaError::ConnectionFailed(_) | OllamaError::Timeout(_) => true,
            OllamaError::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Assistant backed by an Ollama server
///
/// The frame loop is synchronous, so the client owns a small tokio runtime
/// and blocks on each request.
pub struct OllamaAssistant {
    base_url: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
    runtime: Runtime,
}

impl OllamaAssistant {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, OllamaError> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OllamaError::ClientBuild(e.to_string()))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| OllamaError::ClientBuild(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
            client,
            runtime,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn build_request(&self, text: &str, screenshot: Option<&Screenshot>) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
            system: Some(SYSTEM_PROMPT.to_string()),
            images: screenshot
                .map(|s| vec![BASE64.encode(&s.png)])
                .unwrap_or_default(),
            stream: false,
        }
    }

    /// Send a single generate request
    async fn send_generate_request(
        &self,
        request: &GenerateRequest,
    ) -> Result<String, OllamaError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OllamaError::Timeout(self.timeout.as_secs())
                } else {
                    OllamaError::ConnectionFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(OllamaError::ServerError { status, message });
        }

        let generate_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OllamaError::ParseError(e.to_string()))?;

        Ok(generate_response.response)
    }

    /// Generate with retry
    ///
    /// Retries up to 3 times with exponential backoff (100ms, 200ms, 400ms).
    async fn generate(&self, request: &GenerateRequest) -> Result<String, OllamaError> {
        tracing::debug!(
            "Sending generate request to Ollama with model: {} (images: {})",
            request.model,
            request.images.len()
        );

        let mut last_error: Option<OllamaError> = None;

        for attempt in 0..MAX_RETRY_ATTEMPTS {
            match self.send_generate_request(request).await {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::debug!("Request succeeded on attempt {}", attempt + 1);
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if !e.is_retryable() || attempt == MAX_RETRY_ATTEMPTS - 1 {
                        tracing::error!("Ollama request failed (attempt {}): {}", attempt + 1, e);
                        last_error = Some(e);
                        break;
                    }

                    let delay_ms = BASE_RETRY_DELAY_MS * 2u64.pow(attempt);
                    tracing::warn!(
                        "Ollama request failed (attempt {}), retrying in {}ms: {}",
                        attempt + 1,
                        delay_ms,
                        e
                    );
                    last_error = Some(e);
                    sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }

        Err(OllamaError::RetriesExhausted {
            attempts: MAX_RETRY_ATTEMPTS,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

impl Assistant for OllamaAssistant {
    fn query(
        &self,
        text: &str,
        screenshot: Option<&Screenshot>,
    ) -> Result<String, AssistantError> {
        let request = self.build_request(text, screenshot);
        let response = self.runtime.block_on(self.generate(&request))?;

        let answer = response.trim();
        if answer.is_empty() {
            return Err(AssistantError::EmptyResponse);
        }
        Ok(answer.to_string())
    }
}
