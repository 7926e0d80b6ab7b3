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

const MAX_MODEL_PAGES: usize = 20;

/// Google Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    http: Client,
    base_url: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(settings: &LlmSettings, api_key: impl Into<String>) -> Result<Self, BackendError> {
        Ok(Self {
            http: build_http_client(settings)?,
            base_url: trim_base_url(&settings.base_url),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn create_session(&self, spec: SessionSpec) -> Result<Box<dyn Session>, BackendError> {
        let model = spec.model.trim().trim_start_matches("models/").to_string();
        if model.is_empty() {
            return Err(BackendError::InvalidRequest(
                "model identifier cannot be empty".to_string(),
            ));
        }

        Ok(Box::new(GeminiSession {
            http: self.http.clone(),
            url: format!("{}/models/{}:generateContent", self.base_url, model),
            api_key: self.api_key.clone(),
            spec,
            history: Vec::new(),
        }))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, BackendError> {
        let url = format!("{}/models", self.base_url);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_MODEL_PAGES {
            let mut request = self
                .http
                .get(&url)
                .header("x-goog-api-key", &self.api_key)
                .query(&[("pageSize", "1000")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(transport_error)?;
            let page: ListModelsResponse = decode_json(check_status(response).await?).await?;

            models.extend(page.models.into_iter().map(|model| ModelInfo {
                id: model
                    .name
                    .strip_prefix("models/")
                    .unwrap_or(&model.name)
                    .to_string(),
                display_name: model.display_name,
                context_length: model.input_token_limit,
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(models)
    }
}

struct GeminiSession {
    http: Client,
    url: String,
    api_key: String,
    spec: SessionSpec,
    history: Vec<Turn>,
}

impl GeminiSession {
    fn request_body(&self, text: &str) -> GenerateContentRequest {
        let mut contents: Vec<Content> = self
            .history
            .iter()
            .map(|turn| Content::text(turn_role(turn.role), &turn.text))
            .collect();
        contents.push(Content::text("user", text));

        let system_instruction = self
            .spec
            .system_instruction
            .as_deref()
            .filter(|instruction| !instruction.trim().is_empty())
            .map(|instruction| Content {
                role: None,
                parts: vec![Part::text(instruction)],
            });

        let tools = if self.spec.web_search() {
            vec![Tool {
                google_search: GoogleSearch {},
            }]
        } else {
            Vec::new()
        };

        let generation = self.spec.generation;
        let generation_config = (generation.temperature.is_some()
            || generation.max_output_tokens.is_some())
        .then_some(GenerationConfig {
            temperature: generation.temperature,
            max_output_tokens: generation.max_output_tokens,
        });

        GenerateContentRequest {
            contents,
            system_instruction,
            tools,
            generation_config,
        }
    }
}

#[async_trait]
impl Session for GeminiSession {
    async fn send_turn(&mut self, text: &str) -> Result<TurnReply, BackendError> {
        let body = self.request_body(text);
        debug!(
            url = %self.url,
            model = %self.spec.model,
            history = self.history.len(),
            web_search = self.spec.web_search(),
            "sending gemini turn"
        );

        let response = self
            .http
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let payload: GenerateContentResponse = decode_json(check_status(response).await?).await?;

        let Some(candidate) = payload.candidates.into_iter().next() else {
            let reason = payload
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason);
            return Err(BackendError::EmptyResponse(reason));
        };

        let fragments: Vec<String> = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        let grounding = candidate
            .grounding_metadata
            .map(Grounding::from)
            .filter(|grounding| !grounding.is_empty());

        debug!(
            fragments = fragments.len(),
            finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown"),
            "gemini turn finished"
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

fn turn_role(role: TurnRole) -> &'static str {
    match role {
        TurnRole::User => "user",
        TurnRole::Model => "model",
    }
}

// Wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing)]
    thought: bool,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            thought: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    web_search_queries: Vec<String>,
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl From<GroundingMetadata> for Grounding {
    fn from(metadata: GroundingMetadata) -> Self {
        let sources = metadata
            .grounding_chunks
            .into_iter()
            .filter_map(|chunk| chunk.web)
            .filter_map(|web| {
                web.title.map(|title| GroundingSource {
                    title,
                    uri: web.uri,
                })
            })
            .collect();

        Grounding {
            queries: metadata.web_search_queries,
            sources,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<GeminiModel>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiModel {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    input_token_limit: Option<u64>,
}
