use super::constants::*;
use super::types::{ChatSettings, LlmProvider, LlmSettings, ModelSettings};

pub fn default_user_agent() -> String {
    format!("gstage/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for LlmSettings {
    fn default() -> Self {
        let provider = LlmProvider::Gemini;
        Self {
            provider,
            api_key: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: provider.default_base_url().to_string(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            default_model: LlmProvider::Gemini.default_model().to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: None,
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
        }
    }
}
