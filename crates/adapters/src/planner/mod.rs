// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LLM planner: decomposes a work item into developer stories.
//!
//! The planner returns a pure value; mapping story indices to stored ids
//! and persisting the graph is the orchestrator's job.

mod anthropic;
mod extract;

pub use anthropic::AnthropicPlanner;
pub use extract::extract_json;

use async_trait::async_trait;
use fm_core::{StoryType, WorkItem};
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("missing planner credential: set planner.api_key or ANTHROPIC_AUTH_TOKEN")]
    MissingCredential,
    #[error("planner request failed: {0}")]
    External(String),
    #[error("planner response is not valid JSON: {0}")]
    Parse(String),
    #[error("planner returned an invalid plan: {0}")]
    Invalid(String),
    #[error("planner call cancelled")]
    Cancelled,
}

/// A story proposed by the planner, addressed by its position in the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStory {
    pub story_type: StoryType,
    pub title: String,
    pub description: String,
    pub instructions: String,
    pub priority: Option<u8>,
}

/// A dependency between planned stories, by index into the story list.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedDependency {
    pub dependent_index: usize,
    pub required_index: usize,
    pub description: Option<String>,
}

/// Validated decomposition of one work item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RefinementPlan {
    pub analysis: String,
    pub stories: Vec<PlannedStory>,
    pub dependencies: Vec<PlannedDependency>,
}

/// One-shot decomposition of a work item into a story graph.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn refine(
        &self,
        work_item: &WorkItem,
        cancel: &CancellationToken,
    ) -> Result<RefinementPlan, PlannerError>;
}

#[async_trait]
impl<T: Planner> Planner for std::sync::Arc<T> {
    async fn refine(
        &self,
        work_item: &WorkItem,
        cancel: &CancellationToken,
    ) -> Result<RefinementPlan, PlannerError> {
        (**self).refine(work_item, cancel).await
    }
}

// ── Wire format ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WirePlan {
    #[serde(default)]
    analysis: String,
    #[serde(rename = "developerStories", default)]
    developer_stories: Vec<WireStory>,
    #[serde(default)]
    dependencies: Vec<WireDependency>,
}

#[derive(Debug, Deserialize)]
struct WireStory {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    instructions: String,
    #[serde(rename = "storyType")]
    story_type: u8,
    #[serde(default)]
    priority: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct WireDependency {
    #[serde(rename = "dependentStoryIndex")]
    dependent_story_index: i64,
    #[serde(rename = "requiredStoryIndex")]
    required_story_index: i64,
    #[serde(default)]
    description: Option<String>,
}

/// Decode and validate a raw planner response body.
///
/// Story-type codes and dependency indices are checked here; anything out
/// of range is an invalid plan, never silently repaired.
pub(crate) fn parse_plan(text: &str) -> Result<RefinementPlan, PlannerError> {
    let json = extract_json(text)
        .ok_or_else(|| PlannerError::Parse("no JSON object found in response".to_string()))?;
    let wire: WirePlan =
        serde_json::from_str(&json).map_err(|e| PlannerError::Parse(e.to_string()))?;

    let mut stories = Vec::with_capacity(wire.developer_stories.len());
    for (index, story) in wire.developer_stories.into_iter().enumerate() {
        let story_type = StoryType::from_code(story.story_type).ok_or_else(|| {
            PlannerError::Invalid(format!(
                "story {} has unknown storyType code {}",
                index, story.story_type
            ))
        })?;
        stories.push(PlannedStory {
            story_type,
            title: story.title,
            description: story.description,
            instructions: story.instructions,
            priority: story.priority,
        });
    }

    let mut dependencies = Vec::with_capacity(wire.dependencies.len());
    for dep in wire.dependencies {
        let in_range = |i: i64| i >= 0 && (i as usize) < stories.len();
        if !in_range(dep.dependent_story_index) || !in_range(dep.required_story_index) {
            return Err(PlannerError::Invalid(format!(
                "dependency index out of range: {} -> {} (have {} stories)",
                dep.dependent_story_index,
                dep.required_story_index,
                stories.len()
            )));
        }
        if dep.dependent_story_index == dep.required_story_index {
            return Err(PlannerError::Invalid(format!(
                "story {} cannot depend on itself",
                dep.dependent_story_index
            )));
        }
        dependencies.push(PlannedDependency {
            dependent_index: dep.dependent_story_index as usize,
            required_index: dep.required_story_index as usize,
            description: dep.description,
        });
    }

    Ok(RefinementPlan { analysis: wire.analysis, stories, dependencies })
}

/// Prompt sent for one work item.
pub(crate) fn build_prompt(work_item: &WorkItem) -> String {
    let mut prompt = format!(
        "Decompose the following {} into developer stories.\n\n\
         Title: {}\nPriority: {} (1 is most urgent)\n\nDescription:\n{}\n",
        work_item.kind, work_item.title, work_item.priority, work_item.description
    );
    if let Some(criteria) = &work_item.acceptance_criteria {
        prompt.push_str("\nAcceptance criteria:\n");
        prompt.push_str(criteria);
        prompt.push('\n');
    }
    prompt
}

pub(crate) const SYSTEM_PROMPT: &str = "\
You are a software planning assistant. Decompose the given work item into \
fine-grained developer stories and the dependencies between them. Respond \
with a single JSON object of the form:\n\
{\n\
  \"analysis\": \"<free-form text>\",\n\
  \"developerStories\": [\n\
    { \"title\": \"...\", \"description\": \"...\", \"instructions\": \"...\", \"storyType\": 0, \"priority\": 5 }\n\
  ],\n\
  \"dependencies\": [\n\
    { \"dependentStoryIndex\": 1, \"requiredStoryIndex\": 0, \"description\": \"...\" }\n\
  ]\n\
}\n\
storyType codes: 0=implementation, 1=unit tests, 2=feature tests, \
3=documentation. Indices refer to positions in developerStories. The \
dependency graph must be acyclic. Story instructions must be standalone \
and actionable by a coding agent without further context.";

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
