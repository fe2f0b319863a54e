use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::ProviderKind;
use crate::orchestrator::SlotFailurePolicy;

/// FoodPal - dinner recipes and a shared shopping list from a language model
#[derive(Parser, Debug)]
#[command(name = "foodpal", author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Directory holding saved tasks and meal plans
    #[arg(long, env = "FOODPAL_DATA_DIR", default_value = "./data", global = true)]
    pub data_dir: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Model backend and run limits.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    #[arg(long, env = "FOODPAL_PROVIDER", value_enum, default_value_t = ProviderKind::OpenRouter, global = true)]
    pub provider: ProviderKind,

    /// Base URL of a local OpenAI-compatible server
    #[arg(long, env = "FOODPAL_BASE_URL", default_value = "http://localhost:11434", global = true)]
    pub base_url: String,

    #[arg(long, env = "FOODPAL_MODEL", default_value = "llama3", global = true)]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[arg(long, env = "FOODPAL_API_KEY_ENV", global = true)]
    pub api_key_env: Option<String>,

    /// Per-call timeout in seconds
    #[arg(long, env = "FOODPAL_TIMEOUT_SECS", default_value_t = 60, global = true)]
    pub timeout_secs: u64,

    #[arg(long, env = "FOODPAL_MAX_RETRIES", default_value_t = 2, global = true)]
    pub max_retries: u32,

    /// Limit for a whole generation run in seconds
    #[arg(long, env = "FOODPAL_DEADLINE_SECS", global = true)]
    pub deadline_secs: Option<u64>,

    #[arg(long, env = "FOODPAL_SLOT_FAILURE", value_enum, default_value_t = SlotFailurePolicy::Abort, global = true)]
    pub slot_failure: SlotFailurePolicy,

    /// Generate an image per recipe when a backend is available
    #[arg(long, env = "FOODPAL_IMAGES", global = true)]
    pub images: bool,

    /// Ask the server for a JSON response format
    #[arg(long, env = "FOODPAL_JSON_MODE", global = true)]
    pub json_mode: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a meal plan and print it
    Generate {
        #[arg(long, default_value = "local-user")]
        user: String,

        /// Liked foods, comma separated or repeated
        #[arg(long, value_delimiter = ',')]
        liked: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        disliked: Vec<String>,

        #[arg(long = "must-use", value_delimiter = ',')]
        must_use: Vec<String>,

        #[arg(long, default_value_t = 3)]
        count: u32,

        #[arg(long, default_value_t = 4)]
        servings: u32,
    },
    /// List a user's meal plans, newest first
    History {
        #[arg(long, default_value = "local-user")]
        user: String,
    },
    /// Print a saved meal plan
    Show { plan_id: Uuid },
    /// Rate a saved meal plan from 1 to 5
    Rate {
        plan_id: Uuid,

        #[arg(long)]
        rating: u8,

        #[arg(long)]
        notes: Option<String>,
    },
    /// Print the state of a generation task
    Task { task_id: Uuid },
    /// Run the recipe parser over a saved model reply
    Parse {
        file: PathBuf,

        #[arg(long, default_value_t = 4)]
        servings: u32,
    },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
