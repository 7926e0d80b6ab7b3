use crate::error::StageError;

/// Slot values accumulated during one pipeline run, in insertion order.
///
/// Entries are only ever appended; once written a slot keeps its value for
/// the rest of the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineContext {
    entries: Vec<(String, String)>,
}

impl PipelineContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == slot)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.get(slot).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(
        &mut self,
        slot: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), StageError> {
        let slot = slot.into();
        if self.contains(&slot) {
            return Err(StageError::configuration(format!(
                "slot '{slot}' is already set"
            )));
        }
        self.entries.push((slot, value.into()));
        Ok(())
    }
}

/// Audit events recorded while a pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    StageStarted {
        index: usize,
        stage: String,
    },
    StageCompleted {
        index: usize,
        stage: String,
        output: String,
    },
    StageFailed {
        index: usize,
        stage: String,
        error: String,
    },
}

impl PipelineEvent {
    pub fn stage(&self) -> &str {
        match self {
            PipelineEvent::StageStarted { stage, .. }
            | PipelineEvent::StageCompleted { stage, .. }
            | PipelineEvent::StageFailed { stage, .. } => stage,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            PipelineEvent::StageStarted { index, .. }
            | PipelineEvent::StageCompleted { index, .. }
            | PipelineEvent::StageFailed { index, .. } => *index,
        }
    }
}
