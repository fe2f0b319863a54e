use reqwest::Client;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::endpoints::{ChatCompletionRequest, ChatCompletionResponse, Provider, OPENROUTER_URL};

#[derive(Debug, Error)]
pub enum ApiConnectionError {
    #[error("API key not found in environment: {0}")]
    MissingApiKey(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("API error {status}: {error_body}")]
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
}

impl Provider {
    pub fn openrouter(api_key_env_var_name: &str) -> Self {
        Self::OpenRouter {
            api_key: api_key_env_var_name.to_string(),
        }
    }

    /// A local or self-hosted OpenAI-compatible server, e.g.
    /// `http://localhost:11434` for Ollama.
    pub fn openai_compatible(base_url: &str, api_key_env_var_name: Option<&str>) -> Self {
        Self::OpenAiCompatible {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key_env_var_name.map(str::to_string),
        }
    }

    pub fn completions_url(&self) -> String {
        match self {
            Provider::OpenRouter { .. } => OPENROUTER_URL.to_string(),
            Provider::OpenAiCompatible { base_url, .. } => format!("{}/v1/chat/completions", base_url),
        }
    }

    /// Resolves the bearer key, if this provider uses one.
    fn resolve_api_key(&self) -> Result<Option<String>, ApiConnectionError> {
        match self {
            Provider::OpenRouter { api_key, .. } => env::var(api_key)
                .map(Some)
                .map_err(|_| ApiConnectionError::MissingApiKey(api_key.clone())),
            Provider::OpenAiCompatible { api_key: Some(name), .. } => Ok(env::var(name).ok()),
            Provider::OpenAiCompatible { api_key: None, .. } => Ok(None),
        }
    }

    pub async fn call_chat_completion(
        &self,
        client: &Client,
        request: &ChatCompletionRequest,
        timeout: Duration,
    ) -> Result<ChatCompletionResponse, ApiConnectionError> {
        let api_key = self.resolve_api_key()?;
        let url = self.completions_url();

        let mut builder = client
            .post(&url)
            .timeout(timeout)
            .header("Content-Type", "application/json")
            .json(request);
        if let Some(key) = api_key {
            builder = builder.bearer_auth(key);
        }
        if let Provider::OpenRouter { .. } = self {
            let site_url = env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
            let app_name = env::var("APP_NAME").unwrap_or_else(|_| "FoodPal".to_string());
            builder = builder.header("HTTP-Referer", site_url).header("X-Title", app_name);
        }

        debug!(url = %url, model = %request.model, "sending chat completion request");
        let response = builder.send().await?;

        if response.status().is_success() {
            let body = response.text().await?;
            Ok(serde_json::from_str::<ChatCompletionResponse>(&body)?)
        } else {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            Err(ApiConnectionError::ApiError { status, error_body })
        }
    }
}
