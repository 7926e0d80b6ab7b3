use anyhow::Result;

use super::types::{ChatSettings, Config, LlmProvider, LlmSettings, ModelSettings};

#[derive(Debug)]
pub struct ConfigBuilder {
    pub(super) llm: LlmSettings,
    pub(super) models: ModelSettings,
    pub(super) chat: ChatSettings,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            llm: LlmSettings::default(),
            models: ModelSettings::default(),
            chat: ChatSettings::default(),
        }
    }

    /// Switch provider, resetting the base URL and any still-default model id.
    pub fn with_provider(mut self, provider: LlmProvider) -> Self {
        let previous = self.llm.provider;
        if previous == provider {
            return self;
        }

        self.llm.provider = provider;
        self.llm.base_url = provider.default_base_url().to_string();
        if self.models.default_model == previous.default_model() {
            self.models.default_model = provider.default_model().to_string();
        }
        self
    }

    pub fn with_llm<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut LlmSettings),
    {
        update(&mut self.llm);
        self
    }

    pub fn with_models<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut ModelSettings),
    {
        update(&mut self.models);
        self
    }

    pub fn with_chat<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut ChatSettings),
    {
        update(&mut self.chat);
        self
    }

    pub fn build(self) -> Result<Config> {
        Ok(Config {
            llm: self.llm,
            models: self.models,
            chat: self.chat,
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Config> for ConfigBuilder {
    fn from(config: Config) -> Self {
        Self {
            llm: config.llm,
            models: config.models,
            chat: config.chat,
        }
    }
}
