use anyhow::{Context, Result};
use std::io::{self, Write};

use crate::backend::{DynBackend, build_backend, default_credentials};
use crate::config::Config;

/// Backend for the configured provider, keyed from the environment or the
/// config file.
pub(crate) fn connect(config: &Config) -> Result<DynBackend> {
    let credentials = default_credentials(config);
    let backend = build_backend(&config.llm, &credentials)
        .with_context(|| format!("Unable to set up {}", config.llm.provider.display_name()))?;
    Ok(backend)
}

pub(crate) fn model_or_default(model: Option<String>, config: &Config) -> String {
    model
        .map(|model| model.trim().to_string())
        .filter(|model| !model.is_empty())
        .unwrap_or_else(|| config.models.default_model.clone())
}

/// Prints `prompt` and reads one line; `None` once stdin is closed.
pub(crate) fn prompt_line(prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut input = String::new();
    let read = io::stdin().read_line(&mut input)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(['\r', '\n']).to_string()))
}

pub(crate) fn mask_api_key(key: &str) -> String {
    if key.is_empty() {
        return "(not set)".to_string();
    }

    let visible: String = key.chars().take(8).collect();
    format!("{visible}***")
}
