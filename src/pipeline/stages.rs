use tracing::debug;

use crate::agent::StageAgent;
use crate::error::StageError;

use super::context::PipelineContext;
use super::template::PromptTemplate;

/// One step of a pipeline: renders its template and hands the prompt to a
/// fresh copy of its agent. The output is stored under the stage name.
#[derive(Debug)]
pub struct PipelineStage {
    name: String,
    agent: StageAgent,
    template: PromptTemplate,
}

impl PipelineStage {
    pub(crate) fn new(name: String, agent: StageAgent, template: PromptTemplate) -> Self {
        Self {
            name,
            agent,
            template,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn run(&self, context: &PipelineContext) -> Result<String, StageError> {
        let prompt = self.template.render(context)?;
        debug!(stage = %self.name, prompt = %prompt, "rendered stage prompt");

        let mut agent = self.agent.fresh();
        Ok(agent.run(&prompt).await?)
    }
}
