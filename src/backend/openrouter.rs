use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmSettings;
use crate::error::BackendError;

use super::http::{build_http_client, check_status, decode_json, transport_error, trim_base_url};
use super::{
    GenerativeBackend, Grounding, GroundingSource, ModelInfo, Session, SessionSpec, Turn,
    TurnReply, TurnRole,
};

/// OpenAI-compatible chat completions client for OpenRouter.
#[derive(Debug, Clone)]
pub struct OpenRouterBackend {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenRouterBackend {
    pub fn new(settings: &LlmSettings, api_key: impl Into<String>) -> Result<Self, BackendError> {
        Ok(Self {
            http: build_http_client(settings)?,
            base_url: trim_base_url(&settings.base_url),
            api_key: api_key.into(),
        })
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "https://github.com/gstage/gstage")
            .header("X-Title", "gstage")
    }
}

#[async_trait]
impl GenerativeBackend for OpenRouterBackend {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    fn create_session(&self, spec: SessionSpec) -> Result<Box<dyn Session>, BackendError> {
        if spec.model.trim().is_empty() {
            return Err(BackendError::InvalidRequest(
                "model identifier cannot be empty".to_string(),
            ));
        }

        Ok(Box::new(OpenRouterSession {
            backend: self.clone(),
            url: format!("{}/chat/completions", self.base_url),
            spec,
            history: Vec::new(),
        }))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, BackendError> {
        let response = self
            .http
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        let payload: ModelsResponse = decode_json(check_status(response).await?).await?;
        Ok(payload
            .data
            .into_iter()
            .map(|model| ModelInfo {
                id: model.id,
                display_name: model.name,
                context_length: model.context_length,
            })
            .collect())
    }
}

struct OpenRouterSession {
    backend: OpenRouterBackend,
    url: String,
    spec: SessionSpec,
    history: Vec<Turn>,
}

impl OpenRouterSession {
    fn request_body(&self, text: &str) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if let Some(instruction) = self
            .spec
            .system_instruction
            .as_deref()
            .filter(|instruction| !instruction.trim().is_empty())
        {
            messages.push(ChatMessage {
                role: ChatMessageRole::System,
                content: Some(instruction.to_string()),
                annotations: Vec::new(),
            });
        }

        messages.extend(self.history.iter().map(|turn| ChatMessage {
            role: match turn.role {
                TurnRole::User => ChatMessageRole::User,
                TurnRole::Model => ChatMessageRole::Assistant,
            },
            content: Some(turn.text.clone()),
            annotations: Vec::new(),
        }));

        messages.push(ChatMessage {
            role: ChatMessageRole::User,
            content: Some(text.to_string()),
            annotations: Vec::new(),
        });

        ChatCompletionRequest {
            model: self.spec.model.trim().to_string(),
            messages,
            max_tokens: self.spec.generation.max_output_tokens,
            temperature: self.spec.generation.temperature,
            plugins: if self.spec.web_search() {
                vec![Plugin { id: "web" }]
            } else {
                Vec::new()
            },
        }
    }
}

#[async_trait]
impl Session for OpenRouterSession {
    async fn send_turn(&mut self, text: &str) -> Result<TurnReply, BackendError> {
        let body = self.request_body(text);
        debug!(
            model = %body.model,
            messages = body.messages.len(),
            web_search = self.spec.web_search(),
            "sending openrouter turn"
        );

        let response = self
            .backend
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let payload: ChatCompletionResponse = decode_json(check_status(response).await?).await?;

        if let Some(error) = payload.error {
            return Err(BackendError::Http {
                status: error.code.unwrap_or(200),
                body: error.message,
            });
        }

        let Some(choice) = payload.choices.into_iter().next() else {
            return Err(BackendError::EmptyResponse(None));
        };

        let fragments: Vec<String> = choice.message.content.into_iter().collect();
        let sources: Vec<GroundingSource> = choice
            .message
            .annotations
            .into_iter()
            .filter_map(|annotation| annotation.url_citation)
            .map(|citation| GroundingSource {
                title: citation.title.unwrap_or_else(|| citation.url.clone()),
                uri: Some(citation.url),
            })
            .collect();
        let grounding = (!sources.is_empty()).then(|| Grounding {
            queries: Vec::new(),
            sources,
        });

        debug!(
            fragments = fragments.len(),
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            "openrouter turn finished"
        );

        self.history.push(Turn::user(text));
        self.history.push(Turn::model(fragments.concat()));

        Ok(TurnReply {
            fragments,
            grounding,
        })
    }

    fn history(&self) -> &[Turn] {
        &self.history
    }
}

// Wire types

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    plugins: Vec<Plugin>,
}

#[derive(Debug, Clone, Serialize)]
struct Plugin {
    id: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: ChatMessageRole,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing)]
    annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ChatMessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Deserialize)]
struct Annotation {
    #[serde(default)]
    url_citation: Option<UrlCitation>,
}

#[derive(Debug, Clone, Deserialize)]
struct UrlCitation {
    url: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    code: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<OpenRouterModel>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterModel {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    context_length: Option<u64>,
}
