use std::path::PathBuf;

use derive_setters::Setters;
use serde::{Deserialize, Serialize};

use crate::{ModelId, RetryConfig};

/// Where query pipelines are executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreConfig {
    /// In-process aggregation over a JSON or NDJSON file.
    Dataset(PathBuf),
    /// Empty in-process store.
    Empty,
    /// MongoDB `movies` collection.
    Mongo { connection_string: String, database: String },
}

#[derive(Debug, Clone, Setters, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[setters(strip_option, into)]
/// Resolved runtime configuration.
pub struct Environment {
    /// Base URL of the OpenAI-compatible completion endpoint.
    pub provider_url: String,
    /// API key sent as a bearer token.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Model used for translation, rephrasing, chart code and answers.
    pub model: ModelId,
    /// Smaller model used by the router.
    pub router_model: ModelId,
    pub store: StoreConfig,
    /// Appended as a `$limit` when a pipeline does not end with one.
    pub result_limit: u64,
    /// Upper bound on orchestrator node executions per turn.
    pub max_steps: usize,
    /// Upper bound on model calls inside the answering agent.
    pub max_agent_iterations: usize,
    pub retry_config: RetryConfig,
    pub sandbox_max_operations: u64,
    pub sandbox_timeout_ms: u64,
    /// Path to the loaded .env file, if any
    pub env_file: Option<PathBuf>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            provider_url: "https://api.openai.com/v1/".to_string(),
            api_key: None,
            model: ModelId::new("gpt-4o"),
            router_model: ModelId::new("gpt-4o-mini"),
            store: StoreConfig::Empty,
            result_limit: 20,
            max_steps: 100,
            max_agent_iterations: 10,
            retry_config: RetryConfig::default(),
            sandbox_max_operations: 1_000_000,
            sandbox_timeout_ms: 5_000,
            env_file: None,
        }
    }
}
