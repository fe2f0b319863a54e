use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api_connection::connection::ApiConnectionError;
use crate::api_connection::endpoints::{ChatCompletionRequest, ChatMessage, Provider, ResponseFormat};

const SYSTEM_PROMPT: &str =
    "You are a professional chef who writes precise, cookable dinner recipes. You answer with JSON only.";

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error(transparent)]
    Api(#[from] ApiConnectionError),
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    #[error("model returned an empty response")]
    EmptyResponse,
    #[error("model service unavailable: {0}")]
    Unavailable(String),
}

/// A generative text model: one prompt in, raw text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, InvokeError>;
}

/// [`TextGenerator`] over a chat-completions endpoint.
pub struct ChatModelClient {
    provider: Provider,
    model: String,
    client: Client,
    temperature: f32,
    max_tokens: u32,
    json_mode: bool,
}

impl ChatModelClient {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            client: Client::new(),
            temperature: 0.7,
            max_tokens: 1000,
            json_mode: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Asks the server for `response_format: json_object`. Not every local
    /// server supports it.
    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
            response_format: self.json_mode.then(ResponseFormat::json_object),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        }
    }
}

#[async_trait]
impl TextGenerator for ChatModelClient {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, InvokeError> {
        let request = self.build_request(prompt);
        let call = self.provider.call_chat_completion(&self.client, &request, timeout);
        let response = tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| InvokeError::Timeout(timeout))??;

        let content = response.first_content().ok_or(InvokeError::EmptyResponse)?;
        debug!(model = %self.model, chars = content.len(), "received model reply");
        Ok(content.to_string())
    }
}

/// Bounded retry schedule for model calls.
///
/// A call is attempted `1 + max_retries` times. Before retry `n` the policy
/// sleeps `backoff[n - 1]`; the last entry repeats when the schedule is
/// shorter than the retry count, and an empty schedule retries immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: vec![Duration::from_millis(500), Duration::from_secs(1)],
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Vec<Duration>) -> Self {
        Self { max_retries, backoff }
    }

    /// Retries without sleeping; handy for tests and batch tools.
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Vec::new())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before the given retry (1-based).
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        if retry == 0 || self.backoff.is_empty() {
            return Duration::ZERO;
        }
        let index = (retry as usize - 1).min(self.backoff.len() - 1);
        self.backoff[index]
    }
}

#[derive(Debug, Error)]
#[error("model call failed after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: InvokeError,
}

/// Calls the generator until it succeeds or the policy runs out.
pub async fn invoke_with_retry(
    generator: &dyn TextGenerator,
    prompt: &str,
    timeout: Duration,
    policy: &RetryPolicy,
) -> Result<String, RetryExhausted> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let error = match generator.generate(prompt, timeout).await {
            Ok(text) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => InvokeError::EmptyResponse,
            Err(e) => e,
        };

        if attempt >= policy.max_attempts() {
            return Err(RetryExhausted {
                attempts: attempt,
                last_error: error,
            });
        }
        let delay = policy.delay_before_retry(attempt);
        warn!(
            attempt,
            max_attempts = policy.max_attempts(),
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "model call failed, retrying"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
