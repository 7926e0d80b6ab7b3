use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::backend::{DynBackend, GenerationSettings, Grounding, Session, SessionSpec, Turn};
use crate::error::{BackendError, StageError};

use super::role::AgentRole;

/// Text produced by one agent turn, with any search metadata the backend
/// attached to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentReply {
    pub text: String,
    pub grounding: Option<Grounding>,
}

/// A role bound to a model on a generative backend.
///
/// The agent opens its backend session on the first [`run`](Self::run) and keeps
/// it for its whole lifetime, so repeated runs are turns of one conversation.
pub struct StageAgent {
    role: Arc<AgentRole>,
    model: String,
    generation: GenerationSettings,
    backend: DynBackend,
    session: Option<Box<dyn Session>>,
}

impl StageAgent {
    pub fn new(
        role: AgentRole,
        model: impl Into<String>,
        backend: DynBackend,
    ) -> Result<Self, StageError> {
        let model = model.into().trim().to_string();
        if model.is_empty() {
            return Err(StageError::configuration(format!(
                "agent '{}' needs a model identifier",
                role.name()
            )));
        }

        Ok(Self {
            role: Arc::new(role),
            model,
            generation: GenerationSettings::default(),
            backend,
            session: None,
        })
    }

    pub fn with_generation(mut self, generation: GenerationSettings) -> Self {
        self.generation = generation;
        self
    }

    pub fn role(&self) -> &AgentRole {
        &self.role
    }

    /// Same role, model and backend, without a session.
    pub fn fresh(&self) -> Self {
        Self {
            role: Arc::clone(&self.role),
            model: self.model.clone(),
            generation: self.generation,
            backend: Arc::clone(&self.backend),
            session: None,
        }
    }

    pub fn history(&self) -> &[Turn] {
        self.session
            .as_ref()
            .map(|session| session.history())
            .unwrap_or(&[])
    }

    pub async fn run(&mut self, input: &str) -> Result<String, BackendError> {
        self.run_detailed(input).await.map(|reply| reply.text)
    }

    pub async fn run_detailed(&mut self, input: &str) -> Result<AgentReply, BackendError> {
        debug!(
            agent = self.role.name(),
            model = %self.model,
            chars = input.len(),
            "running agent turn"
        );

        let session = self.session()?;
        let reply = session.send_turn(input).await?;
        let text = reply.fragments.concat().trim().to_string();

        debug!(agent = self.role.name(), chars = text.len(), "agent turn finished");

        Ok(AgentReply {
            text,
            grounding: reply.grounding,
        })
    }

    fn session(&mut self) -> Result<&mut dyn Session, BackendError> {
        let session = match self.session.take() {
            Some(session) => session,
            None => {
                debug!(
                    agent = self.role.name(),
                    description = self.role.description(),
                    backend = self.backend.name(),
                    "opening session"
                );
                self.backend.create_session(SessionSpec {
                    model: self.model.clone(),
                    system_instruction: Some(self.role.instruction().to_string())
                        .filter(|instruction| !instruction.is_empty()),
                    capabilities: self.role.capabilities().clone(),
                    generation: self.generation,
                })?
            }
        };

        Ok(self.session.insert(session).as_mut())
    }
}

impl fmt::Debug for StageAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageAgent")
            .field("role", &self.role)
            .field("model", &self.model)
            .field("backend", &self.backend.name())
            .field("turns", &self.history().len())
            .finish()
    }
}
