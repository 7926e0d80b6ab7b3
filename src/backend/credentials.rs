use anyhow::Result;

use crate::config::{Config, LlmProvider, env_string};

/// Supplies API keys to backend construction.
pub trait CredentialSource: Send + Sync {
    fn api_key(&self, provider: LlmProvider) -> Result<Option<String>>;
}

/// Reads the provider's key variables from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn api_key(&self, provider: LlmProvider) -> Result<Option<String>> {
        for var in provider.api_key_env_vars() {
            if let Some(value) = env_string(var)? {
                return Ok(Some(value.trim().to_string()));
            }
        }
        Ok(None)
    }
}

/// A fixed key, typically the one persisted in the config file.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    key: Option<String>,
}

impl StaticCredentials {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            key: (!key.trim().is_empty()).then(|| key.trim().to_string()),
        }
    }
}

impl CredentialSource for StaticCredentials {
    fn api_key(&self, _provider: LlmProvider) -> Result<Option<String>> {
        Ok(self.key.clone())
    }
}

/// Adapts a plain function, e.g. a lookup in a platform secret store.
pub struct CredentialFn<F>(pub F);

impl<F> CredentialSource for CredentialFn<F>
where
    F: Fn(LlmProvider) -> Result<Option<String>> + Send + Sync,
{
    fn api_key(&self, provider: LlmProvider) -> Result<Option<String>> {
        (self.0)(provider)
    }
}

/// Tries each source in order and returns the first key found.
#[derive(Default)]
pub struct ChainedCredentials {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl ChainedCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S>(mut self, source: S) -> Self
    where
        S: CredentialSource + 'static,
    {
        self.sources.push(Box::new(source));
        self
    }
}

impl CredentialSource for ChainedCredentials {
    fn api_key(&self, provider: LlmProvider) -> Result<Option<String>> {
        for source in &self.sources {
            if let Some(key) = source.api_key(provider)? {
                return Ok(Some(key));
            }
        }
        Ok(None)
    }
}

/// Environment first, then the key stored in the config file.
pub fn default_credentials(config: &Config) -> ChainedCredentials {
    ChainedCredentials::new()
        .with(EnvCredentials)
        .with(StaticCredentials::new(config.llm.api_key.clone()))
}
