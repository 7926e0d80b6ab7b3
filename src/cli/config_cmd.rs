use anyhow::{Context, Result};

use crate::config::{Config, ConfigBuilder, LlmProvider};

use super::args::ConfigArgs;
use super::util::mask_api_key;

/// Applies the requested changes on top of `config` and validates the result.
pub(crate) fn apply_config_args(args: &ConfigArgs, config: Config) -> Result<Config> {
    let mut builder = ConfigBuilder::from(config);

    if let Some(ref provider) = args.provider {
        let provider = provider
            .parse::<LlmProvider>()
            .context("Use 'gemini' or 'openrouter'")?;
        builder = builder.with_provider(provider);
    }

    let config = builder
        .with_llm(|llm| {
            if let Some(ref api_key) = args.api_key {
                llm.api_key = api_key.trim().to_string();
            }
            if let Some(timeout) = args.timeout {
                llm.timeout_secs = timeout;
            }
        })
        .with_models(|models| {
            if let Some(ref model) = args.model {
                models.default_model = model.trim().to_string();
            }
            if let Some(max_output_tokens) = args.max_output_tokens {
                models.max_output_tokens = max_output_tokens;
            }
            if args.temperature.is_some() {
                models.temperature = args.temperature;
            }
        })
        .with_chat(|chat| {
            if let Some(ref persona) = args.persona {
                chat.persona = persona.trim().to_string();
            }
        })
        .build()?;

    config.validate()?;
    Ok(config)
}

pub(crate) fn handle_config(args: &ConfigArgs, config: &mut Config) -> Result<()> {
    if args.has_updates() {
        let updated = apply_config_args(args, config.clone())?;
        updated.save()?;
        *config = updated;
        println!(
            "✅ Configuration saved to {}",
            Config::config_path()?.display()
        );
    } else if !args.show {
        println!("Nothing to change. Use 'gstage config --show' or 'gstage config --help'.");
        return Ok(());
    }

    print_config(config)
}

fn print_config(config: &Config) -> Result<()> {
    println!("📋 Current configuration:");
    println!(
        "   Provider: {} ({})",
        config.llm.provider,
        config.llm.provider.display_name()
    );
    println!("   API Key: {}", mask_api_key(&config.llm.api_key));
    println!("   Base URL: {}", config.llm.base_url);
    println!("   Timeout: {}s", config.llm.timeout_secs);
    println!("   Model: {}", config.models.default_model);
    println!("   Max Output Tokens: {}", config.models.max_output_tokens);
    match config.models.temperature {
        Some(temperature) => println!("   Temperature: {temperature}"),
        None => println!("   Temperature: (model default)"),
    }
    println!("   Persona: {}", config.chat.persona);
    println!("   File: {}", Config::config_path()?.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::config::{
        DEFAULT_GEMINI_MODEL, DEFAULT_OPENROUTER_BASE_URL, DEFAULT_OPENROUTER_MODEL,
    };
    use crate::test_support::{EnvGuard, env_lock};

    fn defaults() -> Config {
        Config::builder().build().unwrap()
    }

    fn home_with_config(home: &str, contents: &str) -> EnvGuard {
        let dir = std::path::Path::new(home).join(".gstage");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config"), contents).unwrap();
        EnvGuard::new(&[
            ("HOME", Some(home)),
            ("GSTAGE_TEMPERATURE", None),
            ("GSTAGE_MODEL", None),
            ("GSTAGE_PROVIDER", None),
        ])
    }

    #[test]
    fn out_of_range_stored_value_can_be_overwritten() {
        let _lock = env_lock();
        let temp_home = TempDir::new().unwrap();
        let home = temp_home.path().to_str().unwrap().to_string();
        let _env = home_with_config(&home, r#"{"models":{"temperature":5.0}}"#);

        let err = Config::load().unwrap_err();
        assert!(err.to_string().contains("Temperature must be between 0.0 and 2.0"));

        let mut config = Config::load_unvalidated().unwrap();
        assert_eq!(config.models.temperature, Some(5.0));

        let args = ConfigArgs {
            temperature: Some(1.0),
            ..ConfigArgs::default()
        };
        handle_config(&args, &mut config).unwrap();
        assert_eq!(config.models.temperature, Some(1.0));

        let reloaded = Config::load().unwrap();
        assert_eq!(reloaded.models.temperature, Some(1.0));
    }

    #[test]
    fn show_works_with_out_of_range_stored_value() {
        let _lock = env_lock();
        let temp_home = TempDir::new().unwrap();
        let home = temp_home.path().to_str().unwrap().to_string();
        let _env = home_with_config(&home, r#"{"models":{"temperature":5.0}}"#);

        let mut config = Config::load_unvalidated().unwrap();
        let args = ConfigArgs {
            show: true,
            ..ConfigArgs::default()
        };
        assert!(handle_config(&args, &mut config).is_ok());
    }

    #[test]
    fn switching_provider_resets_url_and_default_model() {
        let args = ConfigArgs {
            provider: Some("openrouter".to_string()),
            api_key: Some(" sk-or-123 ".to_string()),
            ..ConfigArgs::default()
        };

        let config = apply_config_args(&args, defaults()).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::OpenRouter);
        assert_eq!(config.llm.base_url, DEFAULT_OPENROUTER_BASE_URL);
        assert_eq!(config.models.default_model, DEFAULT_OPENROUTER_MODEL);
        assert_eq!(config.llm.api_key, "sk-or-123");
    }

    #[test]
    fn explicit_model_wins_over_provider_default() {
        let args = ConfigArgs {
            provider: Some("openrouter".to_string()),
            model: Some("anthropic/claude-3.5-haiku".to_string()),
            ..ConfigArgs::default()
        };

        let config = apply_config_args(&args, defaults()).unwrap();
        assert_eq!(config.models.default_model, "anthropic/claude-3.5-haiku");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_temperature = ConfigArgs {
            temperature: Some(3.5),
            ..ConfigArgs::default()
        };
        assert!(apply_config_args(&bad_temperature, defaults()).is_err());

        let bad_provider = ConfigArgs {
            provider: Some("cerebras".to_string()),
            ..ConfigArgs::default()
        };
        assert!(apply_config_args(&bad_provider, defaults()).is_err());
    }

    #[test]
    fn untouched_fields_survive() {
        let args = ConfigArgs {
            persona: Some("You are a pirate.".to_string()),
            ..ConfigArgs::default()
        };
        assert!(args.has_updates());

        let config = apply_config_args(&args, defaults()).unwrap();
        assert_eq!(config.chat.persona, "You are a pirate.");
        assert_eq!(config.models.default_model, DEFAULT_GEMINI_MODEL);
        assert!(!ConfigArgs::default().has_updates());
    }
}
