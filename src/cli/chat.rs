use std::io::Write;
use std::ops::ControlFlow;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use colored::Colorize;

use crate::agent::{AgentRole, StageAgent};
use crate::backend::{DynBackend, GenerationSettings};
use crate::config::Config;
use crate::error::StageError;
use crate::render;

use super::args::ChatArgs;
use super::util::{connect, model_or_default, prompt_line};

/// Entries of the chat menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MenuChoice {
    Send,
    ShowHistory,
    Exit,
}

impl FromStr for MenuChoice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(MenuChoice::Send),
            "2" => Ok(MenuChoice::ShowHistory),
            "3" => Ok(MenuChoice::Exit),
            other => Err(anyhow!("Invalid option '{other}'. Please select 1, 2 or 3.")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChatCommand {
    Send(String),
    ShowHistory,
    Exit,
}

impl ChatCommand {
    /// A typed message; `exit` (any case) ends the chat instead of being sent.
    pub(crate) fn message(text: &str) -> Self {
        if text.trim().eq_ignore_ascii_case("exit") {
            ChatCommand::Exit
        } else {
            ChatCommand::Send(text.to_string())
        }
    }
}

pub(crate) struct ChatSession {
    agent: StageAgent,
}

impl ChatSession {
    pub(crate) fn new(
        backend: DynBackend,
        model: &str,
        persona: &str,
        generation: GenerationSettings,
    ) -> Result<Self, StageError> {
        let role = AgentRole::new("chat_assistant", persona)?
            .with_description("Conversational assistant with a fixed persona");
        let agent = StageAgent::new(role, model, backend)?.with_generation(generation);
        Ok(Self { agent })
    }

    pub(crate) fn agent(&self) -> &StageAgent {
        &self.agent
    }

    pub(crate) async fn dispatch<W: Write>(
        &mut self,
        command: ChatCommand,
        out: &mut W,
    ) -> Result<ControlFlow<()>> {
        match command {
            ChatCommand::Send(message) if message.trim().is_empty() => {
                writeln!(out, "⚠️ Empty message, nothing sent.")?;
            }
            ChatCommand::Send(message) => {
                let reply = self.agent.run(&message).await?;
                writeln!(out, "\nYou: {message}\n\nModel: {reply}")?;
            }
            ChatCommand::ShowHistory => {
                if self.agent.history().is_empty() {
                    writeln!(out, "No messages yet.")?;
                } else {
                    write!(out, "{}", render::format_history(self.agent.history()))?;
                }
            }
            ChatCommand::Exit => {
                writeln!(out, "👋 Chat ended.")?;
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }
}

pub(crate) async fn handle_chat(args: ChatArgs, config: &Config) -> Result<()> {
    let model = model_or_default(args.model, config);
    let persona = args.persona.unwrap_or_else(|| config.chat.persona.clone());
    let backend = connect(config)?;
    let mut session = ChatSession::new(
        backend,
        &model,
        &persona,
        GenerationSettings::from(&config.models),
    )?;

    println!("{}", "# Chat Assistant".bold());
    println!("- Model: {}", model.cyan());
    let persona = session.agent().role().instruction();
    println!(
        "- Persona: {}",
        if persona.is_empty() { "default behavior" } else { persona }
    );
    println!("\nReady to chat. Type \"exit\" as a message to quit.");

    let mut stdout = std::io::stdout();
    loop {
        println!("\nOptions:");
        println!("1 - Send a message");
        println!("2 - Show chat history");
        println!("3 - Exit");
        let Some(choice) = prompt_line("Choose an option (1/2/3): ")? else {
            break;
        };

        let command = match choice.parse::<MenuChoice>() {
            Ok(MenuChoice::Send) => match prompt_line("📝 Prompt: ")? {
                Some(message) => ChatCommand::message(&message),
                None => ChatCommand::Exit,
            },
            Ok(MenuChoice::ShowHistory) => ChatCommand::ShowHistory,
            Ok(MenuChoice::Exit) => ChatCommand::Exit,
            Err(err) => {
                render::print_warning(&err.to_string());
                continue;
            }
        };

        match session.dispatch(command, &mut stdout).await {
            Ok(ControlFlow::Break(())) => break,
            Ok(ControlFlow::Continue(())) => {}
            Err(err) => render::print_warning(&format!("{err:#}")),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::test_support::ScriptedBackend;

    fn output(buffer: Vec<u8>) -> String {
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn menu_choices_parse() {
        assert_eq!(" 1 ".parse::<MenuChoice>().unwrap(), MenuChoice::Send);
        assert_eq!("2".parse::<MenuChoice>().unwrap(), MenuChoice::ShowHistory);
        assert_eq!("3".parse::<MenuChoice>().unwrap(), MenuChoice::Exit);
        assert!("4".parse::<MenuChoice>().is_err());
        assert!("".parse::<MenuChoice>().is_err());
    }

    #[test]
    fn exit_message_ends_chat() {
        assert_eq!(ChatCommand::message(" EXIT "), ChatCommand::Exit);
        assert_eq!(
            ChatCommand::message("exit now"),
            ChatCommand::Send("exit now".to_string())
        );
    }

    #[tokio::test]
    async fn send_and_show_history_share_one_session() {
        let (backend, log) = ScriptedBackend::new()
            .reply("hi", "Oh great, a greeting.")
            .reply("how are you?", "Thrilled, obviously.")
            .build();
        let mut session = ChatSession::new(
            backend,
            "gemini-2.0-flash",
            "You are a sarcastic assistant.",
            GenerationSettings::default(),
        )
        .unwrap();
        let mut buffer = Vec::new();

        for message in ["hi", "how are you?"] {
            let flow = session
                .dispatch(ChatCommand::message(message), &mut buffer)
                .await
                .unwrap();
            assert_eq!(flow, ControlFlow::Continue(()));
        }
        session
            .dispatch(ChatCommand::ShowHistory, &mut buffer)
            .await
            .unwrap();

        let printed = output(buffer);
        assert!(printed.contains("Model: Oh great, a greeting."));
        assert!(printed.contains("[4]\nModel: Thrilled, obviously."));
        assert_eq!(log.sessions_created(), 1);
        assert_eq!(
            log.calls()[0].system_instruction.as_deref(),
            Some("You are a sarcastic assistant.")
        );
    }

    #[tokio::test]
    async fn exit_breaks_without_backend_calls() {
        let (backend, log) = ScriptedBackend::new().build();
        let mut session =
            ChatSession::new(backend, "m", "persona", GenerationSettings::default()).unwrap();
        let mut buffer = Vec::new();

        let flow = session
            .dispatch(ChatCommand::Exit, &mut buffer)
            .await
            .unwrap();
        assert_eq!(flow, ControlFlow::Break(()));

        let flow = session
            .dispatch(ChatCommand::Send("   ".to_string()), &mut buffer)
            .await
            .unwrap();
        assert_eq!(flow, ControlFlow::Continue(()));
        assert!(log.calls().is_empty());
    }

    #[tokio::test]
    async fn backend_errors_reach_the_caller() {
        let (backend, _log) = ScriptedBackend::new()
            .fail("hi", BackendError::RateLimited("quota".to_string()))
            .build();
        let mut session =
            ChatSession::new(backend, "m", "persona", GenerationSettings::default()).unwrap();
        let mut buffer = Vec::new();

        let err = session
            .dispatch(ChatCommand::message("hi"), &mut buffer)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<BackendError>(),
            Some(&BackendError::RateLimited("quota".to_string()))
        );
    }
}
