use thiserror::Error;

/// Failures raised by a generative backend while serving a turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Failed to reach backend: {0}")]
    Transport(String),

    #[error("Invalid API key. Please check your API key configuration.")]
    Unauthorized,

    #[error("Rate limit exceeded. Please wait before trying again. (API response: {0})")]
    RateLimited(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Service is temporarily unavailable. Please try again later.")]
    Unavailable,

    #[error("API error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),

    #[error("Backend returned no final response{}", reason_suffix(.0))]
    EmptyResponse(Option<String>),
}

/// Error kinds surfaced by the agent and pipeline core.
///
/// `Configuration` and `Template` are only ever produced while building agents,
/// pipelines or the initial context. `Backend` is only produced while running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StageError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn template(message: impl Into<String>) -> Self {
        Self::Template(message.into())
    }

    #[cfg(test)]
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|reason| format!(" ({reason})"))
        .unwrap_or_default()
}
