use anyhow::anyhow;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::constants::{
    DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_OPENROUTER_BASE_URL,
    DEFAULT_OPENROUTER_MODEL,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmSettings,
    pub models: ModelSettings,
    pub chat: ChatSettings,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    /// Key stored in the config file. Environment keys take precedence.
    pub api_key: String,
    pub timeout_secs: u64,
    pub base_url: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LlmProvider {
    Gemini,
    OpenRouter,
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::Gemini => write!(f, "gemini"),
            LlmProvider::OpenRouter => write!(f, "openrouter"),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(LlmProvider::Gemini),
            "openrouter" => Ok(LlmProvider::OpenRouter),
            other => Err(anyhow!("Unknown LLM provider '{other}'")),
        }
    }
}

impl LlmProvider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            LlmProvider::Gemini => DEFAULT_GEMINI_BASE_URL,
            LlmProvider::OpenRouter => DEFAULT_OPENROUTER_BASE_URL,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            LlmProvider::Gemini => DEFAULT_GEMINI_MODEL,
            LlmProvider::OpenRouter => DEFAULT_OPENROUTER_MODEL,
        }
    }

    /// Environment variables consulted for the API key, in priority order.
    pub fn api_key_env_vars(self) -> &'static [&'static str] {
        match self {
            LlmProvider::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            LlmProvider::OpenRouter => &["OPENROUTER_API_KEY"],
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            LlmProvider::Gemini => "Google Gemini",
            LlmProvider::OpenRouter => "OpenRouter",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub default_model: String,
    pub max_output_tokens: u32,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub persona: String,
}

// File configuration types
#[derive(Debug, Default, Deserialize)]
pub(super) struct FileConfig {
    #[serde(default)]
    pub llm: Option<FileLlmSettings>,
    #[serde(default)]
    pub models: Option<FileModelSettings>,
    #[serde(default)]
    pub chat: Option<FileChatSettings>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FileLlmSettings {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FileModelSettings {
    pub default_model: Option<String>,
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FileChatSettings {
    pub persona: Option<String>,
}

// Serialization helpers
#[derive(Serialize)]
pub(super) struct PersistedConfig<'a> {
    pub llm: PersistedLlm<'a>,
    pub models: PersistedModels<'a>,
    pub chat: PersistedChat<'a>,
}

#[derive(Serialize)]
pub(super) struct PersistedLlm<'a> {
    pub provider: LlmProvider,
    pub api_key: &'a str,
    pub timeout_secs: u64,
    pub base_url: &'a str,
    pub user_agent: &'a str,
}

#[derive(Serialize)]
pub(super) struct PersistedModels<'a> {
    pub default_model: &'a str,
    pub max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Serialize)]
pub(super) struct PersistedChat<'a> {
    pub persona: &'a str,
}

impl<'a> From<&'a Config> for PersistedConfig<'a> {
    fn from(config: &'a Config) -> Self {
        PersistedConfig {
            llm: PersistedLlm {
                provider: config.llm.provider,
                api_key: &config.llm.api_key,
                timeout_secs: config.llm.timeout_secs,
                base_url: &config.llm.base_url,
                user_agent: &config.llm.user_agent,
            },
            models: PersistedModels {
                default_model: &config.models.default_model,
                max_output_tokens: config.models.max_output_tokens,
                temperature: config.models.temperature,
            },
            chat: PersistedChat {
                persona: &config.chat.persona,
            },
        }
    }
}
