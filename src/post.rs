//! The four-stage social media post pipeline: research, plan, draft, review.

use chrono::{Local, NaiveDate};

use crate::agent::{AgentRole, StageAgent};
use crate::backend::{Capability, DynBackend, GenerationSettings};
use crate::error::StageError;
use crate::pipeline::Pipeline;

pub const TOPIC_SLOT: &str = "topic";
pub const DATE_SLOT: &str = "today";

struct PostStage {
    slot: &'static str,
    title: &'static str,
    agent: &'static str,
    description: &'static str,
    instruction: &'static str,
    web_search: bool,
    template: &'static str,
}

const STAGES: [PostStage; 4] = [
    PostStage {
        slot: "releases",
        title: "Researcher",
        agent: "news_agent",
        description: "Agent that searches for information on Google",
        instruction: "
            You are a research assistant. Use the Google search tool (google_search)
            to retrieve up to 5 recent and relevant releases related to the topic below.
            They should be released no more than one month prior to the current date and
            must have received significant media attention. Ignore topics with low coverage or interest.
        ",
        web_search: true,
        template: "Topic: {topic}\nToday's date: {today}",
    },
    PostStage {
        slot: "plan",
        title: "Planner",
        agent: "planner_agent",
        description: "Agent that plans social media posts",
        instruction: "
            You are a content planner specialized in social media.
            Use google_search to understand more about the provided releases.
            Choose the most relevant one and create a plan with the topics that should
            be addressed in an informative and engaging post for social platforms.
        ",
        web_search: true,
        template: "Topic: {topic}\nReleases: {releases}",
    },
    PostStage {
        slot: "draft",
        title: "Writer",
        agent: "writer_agent",
        description: "Agent that writes Instagram posts",
        instruction: "
            You are a Creative Writer at Alura. Based on the provided topic and plan,
            write an Instagram post that is engaging, informative, and easy to understand.
            Include 2 to 4 hashtags at the end.
        ",
        web_search: false,
        template: "Topic: {topic}\nPost plan: {plan}",
    },
    PostStage {
        slot: "review",
        title: "Reviewer",
        agent: "reviewer_agent",
        description: "Agent that reviews Instagram content",
        instruction: "
            You are a content editor focused on Instagram and a young audience.
            Review the draft to ensure clarity, grammar correctness, and appropriate tone.
            If the draft is good, say 'The draft is great and ready to publish!'.
            Otherwise, suggest improvements.
        ",
        web_search: false,
        template: "Topic: {topic}\nDraft: {draft}",
    },
];

pub fn build_post_pipeline(
    backend: DynBackend,
    model: &str,
    generation: GenerationSettings,
) -> Result<Pipeline, StageError> {
    let mut builder = Pipeline::builder().input(TOPIC_SLOT).input(DATE_SLOT);

    for stage in &STAGES {
        let mut role =
            AgentRole::new(stage.agent, stage.instruction)?.with_description(stage.description);
        if stage.web_search {
            role = role.with_capability(Capability::WebSearch);
        }
        let agent =
            StageAgent::new(role, model, backend.clone())?.with_generation(generation);
        builder = builder.stage(stage.slot, agent, stage.template);
    }

    builder.build()
}

/// Human-readable title for a stage slot, e.g. `plan` -> `Planner`.
pub fn stage_title(slot: &str) -> &str {
    STAGES
        .iter()
        .find(|stage| stage.slot == slot)
        .map(|stage| stage.title)
        .unwrap_or(slot)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn today() -> String {
    format_date(Local::now().date_naive())
}
