//! Sequential stage pipelines.
//!
//! Each stage renders a [`PromptTemplate`] against the slots gathered so far,
//! runs a fresh [`StageAgent`](crate::agent::StageAgent) on it and stores the
//! reply under its own name for the stages after it.

mod context;
mod orchestrator;
mod outcome;
mod stages;
mod template;

pub use context::PipelineEvent;
pub use orchestrator::Pipeline;
#[cfg(test)]
pub use outcome::PipelineError;

#[cfg(test)]
use context::PipelineContext;
#[cfg(test)]
use outcome::PipelineState;
#[cfg(test)]
use template::PromptTemplate;
