use anyhow::{Context, Result};
use colored::Colorize;

use crate::backend::GenerationSettings;
use crate::config::Config;
use crate::pipeline::PipelineEvent;
use crate::post::{DATE_SLOT, TOPIC_SLOT, build_post_pipeline, stage_title, today};
use crate::render;

use super::args::PostArgs;
use super::util::{connect, model_or_default, prompt_line};

pub(crate) async fn handle_post(args: PostArgs, config: &Config) -> Result<()> {
    println!("🚀 Launching the post creation pipeline 🚀");

    let topic = if args.topic.is_empty() {
        prompt_line("❓ Please enter the TOPIC you want to create a trend-based post about: ")?
            .unwrap_or_default()
    } else {
        args.topic.join(" ")
    };
    let topic = topic.trim();
    if topic.is_empty() {
        render::print_warning("You forgot to enter the topic!");
        return Ok(());
    }

    let model = model_or_default(args.model, config);
    let pipeline = build_post_pipeline(
        connect(config)?,
        &model,
        GenerationSettings::from(&config.models),
    )?;

    println!(
        "\n✅ Creating post about: {} ({} agents, model {})\n",
        topic.bold(),
        pipeline.stage_count(),
        model.cyan()
    );

    let date = today();
    pipeline
        .execute_with([(TOPIC_SLOT, topic), (DATE_SLOT, date.as_str())], |event| {
            if let PipelineEvent::StageCompleted {
                index,
                stage,
                output,
            } = event
            {
                render::print_header(&format!(
                    "Agent {} Result ({})",
                    index + 1,
                    stage_title(stage)
                ));
                render::print_quoted(output);
            }
        })
        .await
        .context("Post creation stopped")?;

    Ok(())
}
