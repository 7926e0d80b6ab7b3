use tempfile::TempDir;

use crate::test_support::{EnvGuard, env_lock};

use super::environment::{env_parse, env_string};
use super::{Config, DEFAULT_OPENROUTER_BASE_URL, DEFAULT_OPENROUTER_MODEL, LlmProvider};

const CLEARED: &[&str] = &[
    "GSTAGE_PROVIDER",
    "GSTAGE_BASE_URL",
    "GSTAGE_TIMEOUT_SECS",
    "GSTAGE_MODEL",
    "GSTAGE_MAX_OUTPUT_TOKENS",
    "GSTAGE_TEMPERATURE",
    "GSTAGE_PERSONA",
];

fn isolated_env<'a>(home: &'a str, extra: &[(&'a str, Option<&'a str>)]) -> EnvGuard {
    let mut vars: Vec<(&str, Option<&str>)> = vec![("HOME", Some(home))];
    vars.extend(CLEARED.iter().map(|key| (*key, None)));
    vars.extend_from_slice(extra);
    EnvGuard::new(&vars)
}

#[test]
fn load_uses_defaults_without_file_or_env() {
    let _lock = env_lock();
    let temp_home = TempDir::new().unwrap();
    let home = temp_home.path().to_str().unwrap().to_string();
    let _env = isolated_env(&home, &[]);

    let config = Config::load().unwrap();
    assert_eq!(config.llm.provider, LlmProvider::Gemini);
    assert_eq!(config.models.default_model, "gemini-2.0-flash");
    assert_eq!(config.models.temperature, None);
    assert_eq!(config.chat.persona, "You are a sarcastic assistant.");
}

#[test]
fn load_from_env_only() {
    let _lock = env_lock();
    let temp_home = TempDir::new().unwrap();
    let home = temp_home.path().to_str().unwrap().to_string();

    let _env = isolated_env(
        &home,
        &[
            ("GSTAGE_TIMEOUT_SECS", Some("45")),
            ("GSTAGE_MAX_OUTPUT_TOKENS", Some("4096")),
            ("GSTAGE_MODEL", Some("gemini-2.5-pro")),
            ("GSTAGE_TEMPERATURE", Some("0.3")),
        ],
    );

    let config = Config::load().unwrap();
    assert_eq!(config.llm.timeout_secs, 45);
    assert_eq!(config.models.max_output_tokens, 4096);
    assert_eq!(config.models.default_model, "gemini-2.5-pro");
    assert_eq!(config.models.temperature, Some(0.3));
}

#[test]
fn load_prefers_env_over_file() {
    let _lock = env_lock();
    let temp_home = TempDir::new().unwrap();
    let home = temp_home.path().to_str().unwrap().to_string();
    let config_dir = temp_home.path().join(".gstage");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config"),
        r#"{
            "llm": { "api_key": "file-key", "timeout_secs": 20 },
            "models": { "default_model": "file-model", "max_output_tokens": 1024 },
            "chat": { "persona": "You are a pirate." }
        }"#,
    )
    .unwrap();

    let _env = isolated_env(
        &home,
        &[
            ("GSTAGE_TIMEOUT_SECS", Some("40")),
            ("GSTAGE_MODEL", Some("env-model")),
        ],
    );

    let config = Config::load().unwrap();
    assert_eq!(config.llm.api_key, "file-key");
    assert_eq!(config.llm.timeout_secs, 40);
    assert_eq!(config.models.max_output_tokens, 1024);
    assert_eq!(config.models.default_model, "env-model");
    assert_eq!(config.chat.persona, "You are a pirate.");
}

#[test]
fn switching_provider_resets_defaults() {
    let _lock = env_lock();
    let temp_home = TempDir::new().unwrap();
    let home = temp_home.path().to_str().unwrap().to_string();
    let _env = isolated_env(&home, &[("GSTAGE_PROVIDER", Some("openrouter"))]);

    let config = Config::load().unwrap();
    assert_eq!(config.llm.provider, LlmProvider::OpenRouter);
    assert_eq!(config.llm.base_url, DEFAULT_OPENROUTER_BASE_URL);
    assert_eq!(config.models.default_model, DEFAULT_OPENROUTER_MODEL);
}

#[test]
fn switching_provider_keeps_custom_model() {
    let config = Config::builder()
        .with_models(|models| models.default_model = "custom/model".to_string())
        .with_provider(LlmProvider::OpenRouter)
        .build()
        .unwrap();

    assert_eq!(config.models.default_model, "custom/model");
    assert_eq!(config.llm.base_url, DEFAULT_OPENROUTER_BASE_URL);
}

#[test]
fn load_rejects_invalid_temperature() {
    let _lock = env_lock();
    let temp_home = TempDir::new().unwrap();
    let home = temp_home.path().to_str().unwrap().to_string();
    let _env = isolated_env(&home, &[("GSTAGE_TEMPERATURE", Some("3.5"))]);

    let err = Config::load().unwrap_err();
    assert!(err.to_string().contains("Temperature must be between"));
}

#[test]
fn load_rejects_unknown_provider_in_file() {
    let _lock = env_lock();
    let temp_home = TempDir::new().unwrap();
    let home = temp_home.path().to_str().unwrap().to_string();
    let config_dir = temp_home.path().join(".gstage");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config"), r#"{ "llm": { "provider": "acme" } }"#).unwrap();
    let _env = isolated_env(&home, &[]);

    let err = Config::load().unwrap_err();
    assert!(err.to_string().contains("Invalid provider 'acme'"));
}

#[test]
fn save_persists_nested_structure() {
    let _lock = env_lock();
    let temp_home = TempDir::new().unwrap();
    let home = temp_home.path().to_str().unwrap().to_string();
    let _env = isolated_env(&home, &[]);

    let mut config = Config::builder().build().unwrap();
    config.llm.api_key = "test-key".to_string();
    config.llm.timeout_secs = 55;
    config.models.max_output_tokens = 999;
    config.models.default_model = "custom/model".to_string();
    config.chat.persona = "You are terse.".to_string();
    config.save().unwrap();

    let persisted = std::fs::read_to_string(Config::config_path().unwrap()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&persisted).unwrap();
    assert_eq!(json["llm"]["provider"], "gemini");
    assert_eq!(json["llm"]["api_key"], "test-key");
    assert_eq!(json["llm"]["timeout_secs"], 55);
    assert_eq!(json["models"]["default_model"], "custom/model");
    assert_eq!(json["models"]["max_output_tokens"], 999);
    assert!(json["models"].get("temperature").is_none());
    assert_eq!(json["chat"]["persona"], "You are terse.");

    let reloaded = Config::load().unwrap();
    assert_eq!(reloaded.models.default_model, "custom/model");
}

#[test]
fn env_helpers_treat_blank_as_missing() {
    let _lock = env_lock();
    let _env = EnvGuard::new(&[
        ("GSTAGE_TEST_STRING", Some("value")),
        ("GSTAGE_TEST_BLANK", Some("  ")),
        ("GSTAGE_TEST_NUMBER", Some("123")),
        ("GSTAGE_TEST_BAD_NUMBER", Some("abc")),
    ]);

    assert_eq!(
        env_string("GSTAGE_TEST_STRING").unwrap(),
        Some("value".to_string())
    );
    assert_eq!(env_string("GSTAGE_TEST_BLANK").unwrap(), None);
    assert_eq!(env_parse::<u64>("GSTAGE_TEST_NUMBER").unwrap(), Some(123));
    assert_eq!(env_parse::<u32>("GSTAGE_TEST_MISSING").unwrap(), None);
    assert!(env_parse::<u32>("GSTAGE_TEST_BAD_NUMBER").is_err());
}
