use anyhow::{Context, Result};
use dirs::home_dir;
use std::{fs, path::Path};

use super::Config;
use super::builder::ConfigBuilder;
use super::environment::apply_env_overrides;
use super::types::{FileConfig, LlmProvider, PersistedConfig};
use super::validation::validate;

impl Config {
    pub fn config_path() -> Result<std::path::PathBuf> {
        let mut path = home_dir().context("Could not determine home directory")?;
        path.push(".gstage/config");
        Ok(path)
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn load() -> Result<Self> {
        let config = Self::load_unvalidated()?;
        validate(&config)?;
        Ok(config)
    }

    /// Layers file and environment like [`load`](Self::load) but keeps
    /// out-of-range values, so `gstage config` can still repair them.
    pub fn load_unvalidated() -> Result<Self> {
        let path = Self::config_path()?;
        let mut builder = ConfigBuilder::new();

        if path.exists() {
            builder = Self::apply_file(builder, &path)?;
        }

        builder = apply_env_overrides(builder)?;
        builder.build()
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Unable to create config directory {}", parent.display())
            })?;
        }

        let payload = PersistedConfig::from(self);
        let json = serde_json::to_string_pretty(&payload)
            .context("Failed to serialize configuration to JSON")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate(self)
    }

    fn apply_file(builder: ConfigBuilder, path: &Path) -> Result<ConfigBuilder> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed reading config at {}", path.display()))?;

        if contents.trim().is_empty() {
            return Ok(builder);
        }

        let raw: FileConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed parsing JSON config at {}", path.display()))?;

        raw.apply(builder)
    }
}

impl FileConfig {
    pub fn apply(self, mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
        if let Some(llm) = self.llm {
            if let Some(provider) = llm.provider {
                let parsed = provider
                    .parse::<LlmProvider>()
                    .with_context(|| format!("Invalid provider '{provider}' in config file"))?;
                builder = builder.with_provider(parsed);
            }
            builder = builder.with_llm(|settings| {
                if let Some(api_key) = llm.api_key {
                    settings.api_key = api_key;
                }
                if let Some(timeout) = llm.timeout_secs {
                    settings.timeout_secs = timeout;
                }
                if let Some(base_url) = llm.base_url {
                    settings.base_url = base_url;
                }
                if let Some(user_agent) = llm.user_agent {
                    settings.user_agent = user_agent;
                }
            });
        }

        if let Some(models) = self.models {
            builder = builder.with_models(|settings| {
                if let Some(model) = models.default_model {
                    settings.default_model = model;
                }
                if let Some(max_tokens) = models.max_output_tokens {
                    settings.max_output_tokens = max_tokens;
                }
                if models.temperature.is_some() {
                    settings.temperature = models.temperature;
                }
            });
        }

        if let Some(chat) = self.chat {
            builder = builder.with_chat(|settings| {
                if let Some(persona) = chat.persona {
                    settings.persona = persona;
                }
            });
        }

        Ok(builder)
    }
}
