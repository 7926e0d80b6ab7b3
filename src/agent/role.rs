use std::collections::BTreeSet;

use crate::backend::Capability;
use crate::error::StageError;

/// Fixed persona a [`StageAgent`](super::StageAgent) plays.
///
/// The description is metadata for humans and is never sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRole {
    name: String,
    instruction: String,
    description: String,
    capabilities: BTreeSet<Capability>,
}

impl AgentRole {
    pub fn new(name: impl Into<String>, instruction: impl AsRef<str>) -> Result<Self, StageError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(StageError::configuration("agent role name cannot be empty"));
        }

        Ok(Self {
            name,
            instruction: instruction.as_ref().trim().to_string(),
            description: String::new(),
            capabilities: BTreeSet::new(),
        })
    }

    pub fn with_description(mut self, description: impl AsRef<str>) -> Self {
        self.description = description.as_ref().trim().to_string();
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    #[cfg(test)]
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}
