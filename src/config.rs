use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

use crate::api_connection::endpoints::Provider;
use crate::cli::ModelArgs;
use crate::model_invoker::{ChatModelClient, RetryPolicy};
use crate::orchestrator::{GenerationSettings, SlotFailurePolicy};
use crate::store::JsonFileStore;

pub const DEFAULT_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// openrouter.ai
    #[value(name = "openrouter")]
    OpenRouter,
    /// A local OpenAI-compatible server (Ollama, LM Studio)
    Local,
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: ProviderKind,
    pub base_url: String,
    pub model: String,
    pub api_key_env: Option<String>,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub run_deadline: Option<Duration>,
    pub slot_failure: SlotFailurePolicy,
    pub generate_images: bool,
    pub json_mode: bool,
    pub data_dir: PathBuf,
}

impl Settings {
    pub fn from_args(args: &ModelArgs, data_dir: PathBuf) -> Self {
        Self {
            provider: args.provider,
            base_url: args.base_url.clone(),
            model: args.model.clone(),
            api_key_env: args.api_key_env.clone(),
            request_timeout: Duration::from_secs(args.timeout_secs.max(1)),
            max_retries: args.max_retries,
            run_deadline: args.deadline_secs.map(Duration::from_secs),
            slot_failure: args.slot_failure,
            generate_images: args.images,
            json_mode: args.json_mode,
            data_dir,
        }
    }

    /// OpenRouter always needs a key and falls back to `OPENROUTER_API_KEY`;
    /// a local server only gets one when a variable name was given.
    pub fn provider(&self) -> Provider {
        match self.provider {
            ProviderKind::OpenRouter => {
                Provider::openrouter(self.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV))
            }
            ProviderKind::Local => Provider::openai_compatible(&self.base_url, self.api_key_env.as_deref()),
        }
    }

    pub fn text_generator(&self) -> ChatModelClient {
        ChatModelClient::new(self.provider(), self.model.clone()).with_json_mode(self.json_mode)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            retry: self.retry_policy(),
            request_timeout: self.request_timeout,
            run_deadline: self.run_deadline,
            slot_failure: self.slot_failure,
            generate_images: self.generate_images,
        }
    }

    pub fn store(&self) -> JsonFileStore {
        JsonFileStore::new(self.data_dir.clone())
    }
}
