use anyhow::Result;
use colored::Colorize;

use crate::agent::{AgentReply, AgentRole, StageAgent};
use crate::backend::{Capability, DynBackend, GenerationSettings};
use crate::config::Config;
use crate::error::StageError;
use crate::render;

use super::args::AskArgs;
use super::models::print_models;
use super::util::{connect, model_or_default, prompt_line};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AskInput {
    Blank,
    Exit,
    ListModels,
    Question(String),
}

impl AskInput {
    pub(crate) fn parse(line: &str) -> Self {
        let normalized = line.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" => AskInput::Blank,
            "exit" => AskInput::Exit,
            "list_models" => AskInput::ListModels,
            _ => AskInput::Question(line.trim().to_string()),
        }
    }
}

/// Answers one-off questions, each in its own session.
pub(crate) struct Assistant {
    backend: DynBackend,
    model: String,
    generation: GenerationSettings,
}

impl Assistant {
    pub(crate) fn new(backend: DynBackend, model: String, generation: GenerationSettings) -> Self {
        Self {
            backend,
            model,
            generation,
        }
    }

    pub(crate) fn backend(&self) -> &DynBackend {
        &self.backend
    }

    pub(crate) fn model(&self) -> &str {
        &self.model
    }

    pub(crate) async fn answer(
        &self,
        question: &str,
        web_search: bool,
    ) -> Result<AgentReply, StageError> {
        let mut role = AgentRole::new("model_assistant", "")?
            .with_description("Answers questions, optionally grounded in web search");
        if web_search {
            role = role.with_capability(Capability::WebSearch);
        }

        let mut agent = StageAgent::new(role, self.model.as_str(), self.backend.clone())?
            .with_generation(self.generation);
        Ok(agent.run_detailed(question).await?)
    }
}

async fn ask_both_ways(assistant: &Assistant, question: &str) -> Result<()> {
    println!("\n{}\n\n{question}", "Question:".bold());

    render::print_header("Direct response from the model (no search)");
    let direct = assistant.answer(question, false).await?;
    render::print_quoted(&direct.text);

    render::print_header("Response using web search");
    let searched = assistant.answer(question, true).await?;
    render::print_quoted(&searched.text);

    if let Some(grounding) = searched.grounding.filter(|grounding| !grounding.is_empty()) {
        println!("\n{}", "Metadata:".bold());
        for line in render::format_grounding(&grounding) {
            println!("🔍 {line}");
        }
    }
    Ok(())
}

pub(crate) async fn handle_ask(args: AskArgs, config: &Config) -> Result<()> {
    let backend = connect(config)?;
    let assistant = Assistant::new(
        backend,
        model_or_default(args.model, config),
        GenerationSettings::from(&config.models),
    );

    let question = args.question.join(" ");
    if !question.trim().is_empty() {
        return ask_both_ways(&assistant, question.trim()).await;
    }

    println!("{}", "# Assistant".bold());
    println!("using the model {}", assistant.model().cyan());

    loop {
        let Some(line) = prompt_line(
            "\n❓ What would you like to know? (type 'exit' to quit and 'list_models' to list models): ",
        )?
        else {
            break;
        };

        match AskInput::parse(&line) {
            AskInput::Blank => render::print_warning("You forgot to type the question!"),
            AskInput::Exit => {
                println!("👋 Goodbye!");
                break;
            }
            AskInput::ListModels => {
                if let Err(err) = print_models(assistant.backend(), assistant.model()).await {
                    render::print_warning(&format!("{err:#}"));
                }
            }
            AskInput::Question(question) => {
                if let Err(err) = ask_both_ways(&assistant, &question).await {
                    render::print_warning(&format!("{err:#}"));
                }
            }
        }
    }

    Ok(())
}
