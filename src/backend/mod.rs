//! Generative text backends.
//!
//! A backend hands out [`Session`]s; each session keeps its own conversation
//! history and turns one user message into a sequence of text fragments.

mod credentials;
mod gemini;
mod http;
mod openrouter;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{LlmProvider, LlmSettings, ModelSettings};
use crate::error::{BackendError, StageError};

pub use credentials::default_credentials;

use credentials::CredentialSource;
#[cfg(test)]
use credentials::{ChainedCredentials, CredentialFn, EnvCredentials, StaticCredentials};
use gemini::GeminiBackend;
use openrouter::OpenRouterBackend;

pub type DynBackend = Arc<dyn GenerativeBackend>;

/// Optional tools a session may enable on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    WebSearch,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::WebSearch => write!(f, "web-search"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationSettings {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl From<&ModelSettings> for GenerationSettings {
    fn from(models: &ModelSettings) -> Self {
        Self {
            temperature: models.temperature,
            max_output_tokens: Some(models.max_output_tokens),
        }
    }
}

/// Everything a backend needs to open a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSpec {
    pub model: String,
    pub system_instruction: Option<String>,
    pub capabilities: BTreeSet<Capability>,
    pub generation: GenerationSettings,
}

impl SessionSpec {
    #[cfg(test)]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            capabilities: BTreeSet::new(),
            generation: GenerationSettings::default(),
        }
    }

    pub fn web_search(&self) -> bool {
        self.capabilities.contains(&Capability::WebSearch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingSource {
    pub title: String,
    pub uri: Option<String>,
}

/// Search metadata attached to a reply produced with web search enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grounding {
    pub queries: Vec<String>,
    pub sources: Vec<GroundingSource>,
}

impl Grounding {
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty() && self.sources.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnReply {
    /// Text fragments in arrival order.
    pub fragments: Vec<String>,
    pub grounding: Option<Grounding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: String,
    pub display_name: Option<String>,
    pub context_length: Option<u64>,
}

#[async_trait]
pub trait Session: Send {
    /// Send one user turn and collect the backend's final reply.
    async fn send_turn(&mut self, text: &str) -> Result<TurnReply, BackendError>;

    /// Completed turns, oldest first. Failed turns are not recorded.
    fn history(&self) -> &[Turn];
}

#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn create_session(&self, spec: SessionSpec) -> Result<Box<dyn Session>, BackendError>;

    async fn list_models(&self) -> Result<Vec<ModelInfo>, BackendError>;
}

/// Build the backend for the configured provider, resolving its API key
/// through `credentials`.
pub fn build_backend(
    settings: &LlmSettings,
    credentials: &dyn CredentialSource,
) -> Result<DynBackend, StageError> {
    let provider = settings.provider;
    let api_key = credentials
        .api_key(provider)
        .map_err(|err| StageError::configuration(format!("{err:#}")))?
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            StageError::configuration(format!(
                "{} API key not found. Set {} or run 'gstage config --api-key <KEY>'",
                provider.display_name(),
                provider.api_key_env_vars().join(" or ")
            ))
        })?;

    let backend: DynBackend = match provider {
        LlmProvider::Gemini => Arc::new(GeminiBackend::new(settings, api_key)?),
        LlmProvider::OpenRouter => Arc::new(OpenRouterBackend::new(settings, api_key)?),
    };
    Ok(backend)
}
