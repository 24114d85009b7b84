// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prerequisite edges between developer stories.

use crate::clock::Clock;
use crate::id::StoryId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A story may not depend on itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("story {0} cannot depend on itself")]
pub struct SelfDependency(pub StoryId);

/// Directed edge: `dependent_story_id` cannot start until
/// `required_story_id` is completed.
///
/// The edge set forms a DAG; acyclicity is enforced where edges are
/// inserted (refinement) and re-checked by the scheduler pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryDependency {
    pub dependent_story_id: StoryId,
    pub required_story_id: StoryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StoryDependency {
    pub fn new(
        dependent: StoryId,
        required: StoryId,
        description: Option<String>,
        clock: &impl Clock,
    ) -> Result<Self, SelfDependency> {
        if dependent == required {
            return Err(SelfDependency(dependent));
        }
        Ok(Self {
            dependent_story_id: dependent,
            required_story_id: required,
            description,
            created_at: clock.now(),
        })
    }

    /// The `(dependent, required)` pair, unique within the edge set.
    pub fn key(&self) -> (StoryId, StoryId) {
        (self.dependent_story_id, self.required_story_id)
    }
}

#[cfg(test)]
#[path = "dependency_tests.rs"]
mod tests;
