//! Anthropic HTTP client with rate limiting and a hard request timeout

use super::types::{ApiError, Message, MessageRequest, MessageResponse};
use crate::DesignModel;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use specforge_core::{LlmError, SpecForgeError, SpecForgeResult};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

/// Default model for design sessions.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Default per-request timeout. A timeout surfaces as `LlmError::Timeout`
/// and is treated by the session as a retryable turn error.
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

const MAX_TOKENS: i32 = 2400;

/// Anthropic API client. Requests are throttled by a semaphore plus a
/// minimum inter-request interval derived from the requests-per-minute cap.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    rate_limiter: Arc<Semaphore>,
    last_request: Mutex<Option<Instant>>,
    min_request_interval: Duration,
    timeout_ms: u64,
}

impl AnthropicClient {
    /// Create a new client with the default model and timeout.
    ///
    /// # Arguments
    /// * `api_key` - Anthropic API key
    /// * `requests_per_minute` - Maximum requests per minute (default: 50)
    pub fn new(api_key: impl Into<String>, requests_per_minute: u32) -> SpecForgeResult<Self> {
        Self::with_model(api_key, requests_per_minute, DEFAULT_MODEL)
    }

    /// Create a new client for a specific model.
    pub fn with_model(
        api_key: impl Into<String>,
        requests_per_minute: u32,
        model: impl Into<String>,
    ) -> SpecForgeResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SpecForgeError::Llm(LlmError::MissingApiKey {
                provider: PROVIDER.to_string(),
            }));
        }
        let rpm = requests_per_minute.max(1);
        let timeout_ms = DEFAULT_TIMEOUT_MS;
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| {
                SpecForgeError::Llm(LlmError::ProviderError {
                    provider: PROVIDER.to_string(),
                    message: format!("Failed to build HTTP client: {}", e),
                })
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: model.into(),
            rate_limiter: Arc::new(Semaphore::new(rpm as usize)),
            last_request: Mutex::new(None),
            min_request_interval: Duration::from_millis((60_000 / rpm as u64).max(10)),
            timeout_ms,
        })
    }

    /// Override the per-request timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> SpecForgeResult<Self> {
        self.timeout_ms = timeout_ms;
        self.client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| {
                SpecForgeError::Llm(LlmError::ProviderError {
                    provider: PROVIDER.to_string(),
                    message: format!("Failed to build HTTP client: {}", e),
                })
            })?;
        Ok(self)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn throttle(&self) -> SpecForgeResult<tokio::sync::SemaphorePermit<'_>> {
        let permit = self.rate_limiter.acquire().await.map_err(|e| {
            SpecForgeError::Llm(LlmError::ProviderError {
                provider: PROVIDER.to_string(),
                message: format!("Rate limiter error: {}", e),
            })
        })?;

        let wait = {
            let last = self.last_request.lock().map_err(|_| {
                SpecForgeError::Llm(LlmError::ProviderError {
                    provider: PROVIDER.to_string(),
                    message: "Rate limiter lock poisoned".to_string(),
                })
            })?;
            last.map(|t| self.min_request_interval.saturating_sub(t.elapsed()))
                .unwrap_or(Duration::ZERO)
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(Instant::now());
        }
        Ok(permit)
    }

    /// Make an API request with rate limiting and error mapping.
    pub async fn request<Req: Serialize, Res: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Req,
    ) -> SpecForgeResult<Res> {
        let _permit = self.throttle().await?;

        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::debug!(url = %url, "sending provider request");
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SpecForgeError::Llm(LlmError::Timeout {
                        provider: PROVIDER.to_string(),
                        timeout_ms: self.timeout_ms,
                    })
                } else {
                    SpecForgeError::Llm(LlmError::ProviderError {
                        provider: PROVIDER.to_string(),
                        message: format!("HTTP request failed: {}", e),
                    })
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(|e| {
                SpecForgeError::Llm(LlmError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    reason: format!("Failed to parse response: {}", e),
                })
            });
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = match serde_json::from_str::<ApiError>(&error_text) {
            Ok(api_error) => api_error.error.message,
            Err(_) => error_text,
        };
        tracing::warn!(status = %status, message = %message, "provider request failed");

        Err(SpecForgeError::Llm(match status {
            StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
                provider: PROVIDER.to_string(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::InvalidApiKey {
                provider: PROVIDER.to_string(),
            },
            _ => LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                status: status.as_u16() as i32,
                message,
            },
        }))
    }
}

#[async_trait]
impl DesignModel for AnthropicClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> SpecForgeResult<String> {
        let request = MessageRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: user_prompt.to_string(),
            }],
            max_tokens: MAX_TOKENS,
            system: Some(system_prompt.to_string()),
            temperature: Some(0.0),
        };
        let response: MessageResponse = self.request("messages", request).await?;
        tracing::debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = ?response.stop_reason,
            "model turn completed"
        );
        Ok(response.text())
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_rejected() {
        let err = AnthropicClient::new("  ", 50).unwrap_err();
        assert!(matches!(
            err,
            SpecForgeError::Llm(LlmError::MissingApiKey { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = AnthropicClient::new("sk-test-key", 50).unwrap();
        let printed = format!("{:?}", client);
        assert!(printed.contains("[REDACTED]"));
        assert!(!printed.contains("sk-test-key"));
    }

    #[test]
    fn test_rpm_floor() {
        let client = AnthropicClient::new("sk-test-key", 0).unwrap();
        assert_eq!(client.min_request_interval, Duration::from_millis(60_000));
    }
}
