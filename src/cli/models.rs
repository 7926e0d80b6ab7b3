use anyhow::{Context, Result};
use colored::Colorize;

use crate::backend::DynBackend;
use crate::config::Config;
use crate::render::format_model_list;

use super::util::connect;

pub(crate) async fn print_models(backend: &DynBackend, active: &str) -> Result<()> {
    let models = backend
        .list_models()
        .await
        .with_context(|| format!("Failed to fetch models from {}", backend.name()))?;

    if models.is_empty() {
        println!("⚠️  No models were returned.");
        return Ok(());
    }

    println!("\n{}\n", "📦 Available models:".bold());
    for line in format_model_list(&models, active) {
        if line.ends_with("(active)") {
            println!("{}", line.green().bold());
        } else {
            println!("{line}");
        }
    }
    Ok(())
}

pub(crate) async fn handle_models(config: &Config) -> Result<()> {
    let backend = connect(config)?;
    println!(
        "Provider: {} ({})",
        config.llm.provider,
        config.llm.provider.display_name()
    );
    print_models(&backend, &config.models.default_model).await
}
