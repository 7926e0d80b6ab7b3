use thiserror::Error;

use crate::error::StageError;

use super::context::{PipelineContext, PipelineEvent};

/// Progress of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    /// Stage `i` is the next one to run.
    Running(usize),
    Completed,
    Failed {
        stage_index: usize,
        error: StageError,
    },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed { .. })
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub output: String,
    pub context: PipelineContext,
    pub events: Vec<PipelineEvent>,
}

/// A stage failed; carries everything gathered before it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stage {stage_index} ('{stage_name}') failed: {error}")]
pub struct StageFailure {
    pub stage_index: usize,
    pub stage_name: String,
    #[source]
    pub error: StageError,
    pub context: PipelineContext,
    pub events: Vec<PipelineEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The initial inputs were rejected; no stage ran.
    #[error("invalid pipeline input: {0}")]
    Input(#[source] StageError),

    #[error(transparent)]
    Stage(Box<StageFailure>),
}

impl PipelineError {
    pub fn failure(&self) -> Option<&StageFailure> {
        match self {
            PipelineError::Stage(failure) => Some(&**failure),
            PipelineError::Input(_) => None,
        }
    }
}
