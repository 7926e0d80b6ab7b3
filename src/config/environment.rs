use anyhow::{Context, Result, anyhow};
use std::env;
use std::str::FromStr;

use super::builder::ConfigBuilder;
use super::types::LlmProvider;

pub fn apply_env_overrides(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    if let Some(provider_raw) = env_string("GSTAGE_PROVIDER")? {
        let provider = provider_raw
            .parse::<LlmProvider>()
            .with_context(|| format!("Failed to parse GSTAGE_PROVIDER value '{provider_raw}'"))?;
        builder = builder.with_provider(provider);
    }

    if let Some(base_url) = env_string("GSTAGE_BASE_URL")? {
        builder = builder.with_llm(|llm| llm.base_url = base_url);
    }

    if let Some(timeout) = env_parse::<u64>("GSTAGE_TIMEOUT_SECS")? {
        builder = builder.with_llm(|llm| llm.timeout_secs = timeout);
    }

    if let Some(model) = env_string("GSTAGE_MODEL")? {
        builder = builder.with_models(|models| models.default_model = model);
    }

    if let Some(max_tokens) = env_parse::<u32>("GSTAGE_MAX_OUTPUT_TOKENS")? {
        builder = builder.with_models(|models| models.max_output_tokens = max_tokens);
    }

    if let Some(temperature) = env_parse::<f32>("GSTAGE_TEMPERATURE")? {
        builder = builder.with_models(|models| models.temperature = Some(temperature));
    }

    if let Some(persona) = env_string("GSTAGE_PERSONA")? {
        builder = builder.with_chat(|chat| chat.persona = persona);
    }

    Ok(builder)
}

pub fn env_string(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(val) if val.trim().is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(anyhow!("{key} contains invalid UTF-8")),
    }
}

pub fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_string(key)? {
        Some(value) => {
            let parsed = value
                .trim()
                .parse::<T>()
                .with_context(|| format!("Failed to parse {key} value '{value}'"))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
