use anyhow::{Result, bail};

use super::types::Config;

pub fn validate(config: &Config) -> Result<()> {
    if config.models.default_model.trim().is_empty() {
        bail!("Model identifier cannot be empty");
    }

    if config.llm.timeout_secs == 0 {
        bail!("Timeout must be a positive number of seconds");
    }

    if config.llm.base_url.trim().is_empty() {
        bail!(
            "{} base URL cannot be empty",
            config.llm.provider.display_name()
        );
    }

    if let Some(temperature) = config.models.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            bail!("Temperature must be between 0.0 and 2.0 (got {temperature})");
        }
    }

    Ok(())
}
