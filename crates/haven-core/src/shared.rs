//! Shared types used across all Haven crates.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Message author role in a conversation, OpenAI-compatible on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a conversation: who said it and what was said.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Unified chat request consumed by the pipeline.
///
/// Callers that only have a single message wrap it into a one-element
/// history; the pipeline never sees a bare string. History is supplied by
/// the caller and never persisted or mutated here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Ordered conversation history, oldest first. The last user turn is
    /// the free text under validation.
    #[serde(default)]
    pub messages: Vec<ChatTurn>,
    /// Four-digit birth year for the eligibility gate. Absent means the
    /// caller did not go through age capture; the gate is skipped.
    #[serde(default)]
    pub birth_year: Option<i32>,
    /// Deployment-time persona override. When set, replaces the configured
    /// persona prompt for this request.
    #[serde(default)]
    pub system_override: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Builds a single-turn request from one user message.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatTurn::user(message)],
            ..Self::default()
        }
    }

    /// The most recent user-authored text, if any. This is what the
    /// validator and crisis detector operate on.
    pub fn latest_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
    }
}

/// Parameters forwarded to the model provider on each call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 400,
        }
    }
}

/// Global application configuration (gateway + pipeline policy). Load from TOML or env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Application identity shown in logs and the status line.
    pub app_name: String,
    /// HTTP port for the gateway.
    pub port: u16,
    /// Base directory for the sled passage store.
    pub storage_path: String,
    /// LLM mode: "mock" (deterministic, keyless) or "live" (external API).
    pub llm_mode: String,
    /// OpenAI-compatible chat completions endpoint used in live mode.
    pub llm_api_url: String,
    /// When true, provider error detail is withheld from HTTP responses.
    pub production: bool,

    /// Per-client request budget on the chat route, per minute. Zero
    /// disables the limiter.
    pub rate_limit_per_minute: u32,

    /// Exact origins allowed by CORS. Empty list falls back to the local
    /// development origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    pub default_model: String,
    pub default_temperature: f32,
    pub default_max_tokens: u32,

    /// Hostnames allowed to appear as citations in model output. Empty
    /// means use the built-in canonical list.
    #[serde(default)]
    pub trusted_domains: Vec<String>,
    /// Risk phrases for the crisis detector. Empty means use the built-in
    /// canonical list.
    #[serde(default)]
    pub crisis_phrases: Vec<String>,
}

impl CoreConfig {
    /// Default model parameters derived from config.
    pub fn default_params(&self) -> ModelParams {
        ModelParams {
            model: self.default_model.clone(),
            temperature: self.default_temperature,
            max_tokens: self.default_max_tokens,
        }
    }

    /// Load config from file and environment. Precedence: env `HAVEN_CONFIG`
    /// path > `config/gateway.toml` > defaults. Env vars use the `HAVEN`
    /// prefix with `__` separators (e.g. `HAVEN__PORT=8080`).
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("HAVEN_CONFIG").unwrap_or_else(|_| "config/gateway.toml".to_string());
        let builder = config::Config::builder()
            .set_default("app_name", "Haven Gateway")?
            .set_default("port", 3000_i64)?
            .set_default("storage_path", "./data")?
            .set_default("llm_mode", "mock")?
            .set_default("llm_api_url", "https://api.openai.com/v1/chat/completions")?
            .set_default("production", false)?
            .set_default("rate_limit_per_minute", 60_i64)?
            .set_default("default_model", "gpt-3.5-turbo")?
            .set_default("default_temperature", 0.7_f64)?
            .set_default("default_max_tokens", 400_i64)?;

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("HAVEN").separator("__"))
            .build()?;

        built.try_deserialize()
    }
}
