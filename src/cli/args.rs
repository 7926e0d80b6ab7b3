use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::config::Config;

use super::commands;

/// Entry point for the `gstage` command-line interface.
#[derive(Debug, Parser)]
#[command(
    name = "gstage",
    about = "Multi-stage generative text pipelines from the terminal",
    version,
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose logging of backend requests and responses
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Research, plan, write and review a social media post about a topic.
    Post(PostArgs),
    /// Chat with a persona; history is kept for the whole session.
    Chat(ChatArgs),
    /// Ask a question, answered directly and again with web search.
    Ask(AskArgs),
    /// List the models offered by the configured provider.
    Models,
    /// Show or update the stored configuration.
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct PostArgs {
    /// Override the model for every stage.
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// Topic of the post; prompted for when omitted.
    pub topic: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Override the model.
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// System instruction for this chat (defaults to the configured persona).
    #[arg(long)]
    pub persona: Option<String>,
}

#[derive(Debug, Args)]
pub struct AskArgs {
    /// Override the model.
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// Question to ask; starts an interactive loop when omitted.
    pub question: Vec<String>,
}

#[derive(Debug, Default, Args)]
pub struct ConfigArgs {
    /// Print the current configuration.
    #[arg(long)]
    pub show: bool,

    /// Store the API key for the selected provider.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Select the provider (gemini or openrouter).
    #[arg(long)]
    pub provider: Option<String>,

    /// Set the default model.
    #[arg(long)]
    pub model: Option<String>,

    /// Set the request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Set the maximum number of output tokens per reply.
    #[arg(long)]
    pub max_output_tokens: Option<u32>,

    /// Set the sampling temperature (0.0 to 2.0).
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Set the default chat persona.
    #[arg(long)]
    pub persona: Option<String>,
}

impl ConfigArgs {
    pub fn has_updates(&self) -> bool {
        self.api_key.is_some()
            || self.provider.is_some()
            || self.model.is_some()
            || self.timeout.is_some()
            || self.max_output_tokens.is_some()
            || self.temperature.is_some()
            || self.persona.is_some()
    }
}

impl Cli {
    pub async fn run(self, config: Config) -> Result<()> {
        commands::run(self, config).await
    }
}
