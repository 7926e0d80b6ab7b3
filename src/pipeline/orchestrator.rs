use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info, warn};

use crate::agent::StageAgent;
use crate::error::{BackendError, StageError};

use super::context::{PipelineContext, PipelineEvent};
use super::outcome::{PipelineError, PipelineOutput, PipelineState, StageFailure};
use super::stages::PipelineStage;
use super::template::{PromptTemplate, is_valid_slot_name};

type Observer<'a> = Box<dyn FnMut(&PipelineEvent) + Send + 'a>;

/// A fixed, ordered sequence of stages whose outputs feed later prompts.
#[derive(Debug)]
pub struct Pipeline {
    inputs: Vec<String>,
    stages: Vec<PipelineStage>,
    allow_empty_outputs: bool,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Checks the initial inputs and returns a runner positioned before the
    /// first stage. Nothing is sent to the backend here.
    pub fn start<I, K, V>(&self, inputs: I) -> Result<PipelineRunner<'_>, StageError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut context = PipelineContext::new();
        for (slot, value) in inputs {
            let slot = slot.into();
            let value = value.into();
            if !self.inputs.contains(&slot) {
                return Err(StageError::configuration(format!(
                    "unknown input '{slot}'"
                )));
            }
            if value.trim().is_empty() {
                return Err(StageError::configuration(format!(
                    "input '{slot}' cannot be empty"
                )));
            }
            context.insert(slot, value)?;
        }

        if let Some(missing) = self.inputs.iter().find(|slot| !context.contains(slot)) {
            return Err(StageError::configuration(format!(
                "missing input '{missing}'"
            )));
        }

        Ok(PipelineRunner {
            pipeline: self,
            context,
            state: PipelineState::Idle,
            events: Vec::new(),
            output: None,
            observer: None,
        })
    }

    pub async fn execute<I, K, V>(&self, inputs: I) -> Result<PipelineOutput, PipelineError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.start(inputs)
            .map_err(PipelineError::Input)?
            .run_to_completion()
            .await
    }

    /// Like [`execute`](Self::execute), reporting every event to `observer`
    /// as it happens.
    pub async fn execute_with<I, K, V, F>(
        &self,
        inputs: I,
        observer: F,
    ) -> Result<PipelineOutput, PipelineError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
        F: FnMut(&PipelineEvent) + Send,
    {
        self.start(inputs)
            .map_err(PipelineError::Input)?
            .with_observer(observer)
            .run_to_completion()
            .await
    }
}

fn err_message(err: &StageError) -> String {
    match err {
        StageError::Configuration(message) | StageError::Template(message) => message.clone(),
        StageError::Backend(err) => err.to_string(),
    }
}

/// Drives one run of a [`Pipeline`] a stage at a time.
///
/// A caller that stops calling [`step`](Self::step) cancels the run between
/// stages; a stage in flight always finishes.
pub struct PipelineRunner<'a> {
    pipeline: &'a Pipeline,
    context: PipelineContext,
    state: PipelineState,
    events: Vec<PipelineEvent>,
    output: Option<String>,
    observer: Option<Observer<'a>>,
}

impl<'a> PipelineRunner<'a> {
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&PipelineEvent) + Send + 'a,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Runs the next stage. Stepping a finished runner leaves it untouched.
    pub async fn step(&mut self) -> &PipelineState {
        let index = match self.state {
            PipelineState::Idle => 0,
            PipelineState::Running(index) => index,
            PipelineState::Completed | PipelineState::Failed { .. } => return &self.state,
        };
        self.state = PipelineState::Running(index);

        let pipeline = self.pipeline;
        let Some(stage) = pipeline.stages.get(index) else {
            self.state = PipelineState::Completed;
            return &self.state;
        };

        info!(stage = stage.name(), index, "running stage");
        self.record(PipelineEvent::StageStarted {
            index,
            stage: stage.name().to_string(),
        });

        let result = stage.run(&self.context).await.and_then(|output| {
            if output.is_empty() && !pipeline.allow_empty_outputs {
                Err(StageError::Backend(BackendError::EmptyResponse(Some(
                    "stage produced no text".to_string(),
                ))))
            } else {
                Ok(output)
            }
        });

        match result {
            Ok(output) => {
                debug!(stage = stage.name(), index, chars = output.len(), "stage finished");
                if let Err(err) = self.context.insert(stage.name(), output.clone()) {
                    return self.fail(index, stage.name(), err);
                }
                self.record(PipelineEvent::StageCompleted {
                    index,
                    stage: stage.name().to_string(),
                    output: output.clone(),
                });
                self.output = Some(output);
                self.state = if index + 1 < pipeline.stages.len() {
                    PipelineState::Running(index + 1)
                } else {
                    PipelineState::Completed
                };
            }
            Err(err) => return self.fail(index, stage.name(), err),
        }

        &self.state
    }

    /// Steps until the run completes or a stage fails.
    pub async fn run_to_completion(mut self) -> Result<PipelineOutput, PipelineError> {
        while !self.state.is_terminal() {
            self.step().await;
        }
        self.finish()
    }

    fn finish(self) -> Result<PipelineOutput, PipelineError> {
        match self.state {
            PipelineState::Failed { stage_index, error } => {
                let stage_name = self
                    .pipeline
                    .stages
                    .get(stage_index)
                    .map(|stage| stage.name().to_string())
                    .unwrap_or_default();
                Err(PipelineError::Stage(Box::new(StageFailure {
                    stage_index,
                    stage_name,
                    error,
                    context: self.context,
                    events: self.events,
                })))
            }
            _ => Ok(PipelineOutput {
                output: self.output.unwrap_or_default(),
                context: self.context,
                events: self.events,
            }),
        }
    }

    fn fail(&mut self, index: usize, stage: &str, error: StageError) -> &PipelineState {
        warn!(stage, index, error = %error, "stage failed");
        self.record(PipelineEvent::StageFailed {
            index,
            stage: stage.to_string(),
            error: error.to_string(),
        });
        self.state = PipelineState::Failed {
            stage_index: index,
            error,
        };
        &self.state
    }

    fn record(&mut self, event: PipelineEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
        self.events.push(event);
    }
}

impl fmt::Debug for PipelineRunner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("state", &self.state)
            .field("context", &self.context)
            .field("events", &self.events)
            .finish()
    }
}

/// Collects inputs and stages; every structural check happens in
/// [`build`](Self::build).
#[derive(Default)]
pub struct PipelineBuilder {
    inputs: Vec<String>,
    stages: Vec<(String, StageAgent, String)>,
    allow_empty_outputs: bool,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an initial slot the caller must supply to every run.
    pub fn input(mut self, slot: impl Into<String>) -> Self {
        self.inputs.push(slot.into());
        self
    }

    pub fn stage(
        mut self,
        name: impl Into<String>,
        agent: StageAgent,
        template: impl Into<String>,
    ) -> Self {
        self.stages.push((name.into(), agent, template.into()));
        self
    }

    /// Store empty stage outputs instead of failing the run on them.
    pub fn allow_empty_outputs(mut self, allow: bool) -> Self {
        self.allow_empty_outputs = allow;
        self
    }

    pub fn build(self) -> Result<Pipeline, StageError> {
        if self.stages.is_empty() {
            return Err(StageError::configuration(
                "pipeline needs at least one stage",
            ));
        }

        let mut known: HashSet<String> = HashSet::new();
        for slot in &self.inputs {
            declare_slot(&mut known, slot, "input")?;
        }

        let mut stages = Vec::with_capacity(self.stages.len());
        for (name, agent, source) in self.stages {
            let template = PromptTemplate::parse(source).map_err(|err| {
                StageError::template(format!("stage '{name}': {}", err_message(&err)))
            })?;
            let slots = template.slots();
            if let Some(undefined) = slots.iter().find(|slot| !known.contains(**slot)) {
                return Err(StageError::template(format!(
                    "stage '{name}' references undefined slot '{undefined}'"
                )));
            }
            declare_slot(&mut known, &name, "stage")?;
            stages.push(PipelineStage::new(name, agent, template));
        }

        debug!(
            inputs = self.inputs.len(),
            stages = stages.len(),
            "pipeline built"
        );

        Ok(Pipeline {
            inputs: self.inputs,
            stages,
            allow_empty_outputs: self.allow_empty_outputs,
        })
    }
}

fn declare_slot(known: &mut HashSet<String>, slot: &str, kind: &str) -> Result<(), StageError> {
    if !is_valid_slot_name(slot) {
        return Err(StageError::configuration(format!(
            "invalid {kind} name '{slot}'"
        )));
    }
    if !known.insert(slot.to_string()) {
        return Err(StageError::template(format!(
            "slot '{slot}' is defined more than once"
        )));
    }
    Ok(())
}
