//! Configuration management for gstage.
//!
//! Settings are layered the same way every time they are loaded:
//! - built-in defaults
//! - the JSON file at `~/.gstage/config`
//! - environment variable overrides
//!
//! API keys are resolved separately through the backend's credential sources
//! so the core never depends on where a secret lives.

mod builder;
mod constants;
mod defaults;
mod environment;
mod loader;
mod types;
mod validation;

pub use builder::ConfigBuilder;
#[cfg(test)]
pub use constants::{DEFAULT_GEMINI_MODEL, DEFAULT_OPENROUTER_BASE_URL, DEFAULT_OPENROUTER_MODEL};
pub(crate) use environment::env_string;
pub use types::{Config, LlmProvider, LlmSettings, ModelSettings};

#[cfg(test)]
mod tests;
