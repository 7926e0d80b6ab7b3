use anyhow::Result;

use crate::config::Config;

use super::args::{Cli, Command};
use super::ask;
use super::chat;
use super::config_cmd;
use super::models;
use super::post;

pub(crate) async fn run(cli: Cli, mut config: Config) -> Result<()> {
    if !matches!(cli.command, Some(Command::Config(_)) | None) {
        config.validate()?;
    }

    match cli.command {
        Some(Command::Post(args)) => post::handle_post(args, &config).await,
        Some(Command::Chat(args)) => chat::handle_chat(args, &config).await,
        Some(Command::Ask(args)) => ask::handle_ask(args, &config).await,
        Some(Command::Models) => models::handle_models(&config).await,
        Some(Command::Config(args)) => config_cmd::handle_config(&args, &mut config),
        None => show_welcome_message(),
    }
}

fn show_welcome_message() -> Result<()> {
    let config_path = Config::config_path()?;

    println!("🚀 Welcome to gstage - multi-stage generative text pipelines!");
    println!();
    println!("📖 What gstage does:");
    println!("   • Chains specialised agents, each stage feeding the next");
    println!("   • Researches, plans, writes and reviews social media posts");
    println!("   • Chats with a persona and answers questions with web search");
    println!("   • Works with Google Gemini or any OpenRouter model");
    println!();

    if !config_path.exists() {
        println!("⚠️  No configuration file yet. Set an API key to get started:");
        println!("   gstage config --api-key YOUR_KEY");
        println!("   (or export GEMINI_API_KEY / OPENROUTER_API_KEY)");
        println!();
    }

    println!("💡 How to use gstage:");
    println!("   gstage post 'rust async runtimes'          # Four-agent post pipeline");
    println!("   gstage chat --persona 'You are a pirate.'  # Chat with history");
    println!("   gstage ask 'who won the last world cup?'   # Direct vs web-search answer");
    println!("   gstage ask                                 # Interactive question loop");
    println!("   gstage models                              # List available models");
    println!("   gstage config --show                       # Show current settings");
    println!("   gstage config --provider openrouter        # Switch provider");
    println!();
    println!("❓ For more help: gstage --help");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn backend_commands_reject_invalid_config() {
        let config = Config::builder()
            .with_models(|models| models.temperature = Some(5.0))
            .build()
            .unwrap();
        let cli = Cli {
            command: Some(Command::Models),
            verbose: false,
        };

        let err = run(cli, config).await.unwrap_err();
        assert!(err.to_string().contains("Temperature must be between 0.0 and 2.0"));
    }
}
