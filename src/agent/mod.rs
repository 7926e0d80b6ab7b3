mod role;
mod stage_agent;

pub use role::AgentRole;
pub use stage_agent::{AgentReply, StageAgent};
