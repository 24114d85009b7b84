// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Developer stories: fine-grained tasks produced by refinement.

use crate::clock::Clock;
use crate::id::{StoryId, WorkItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default story priority when the planner leaves it unset.
pub const DEFAULT_STORY_PRIORITY: u8 = 5;

/// What kind of deliverable a story produces.
///
/// The derived ordering is the scheduling order: implementation before
/// tests before documentation. Wire codes (planner JSON) follow the same
/// sequence, 0..=3.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StoryType {
    Implementation,
    UnitTests,
    FeatureTests,
    Documentation,
}

crate::simple_display! {
    StoryType {
        Implementation => "implementation",
        UnitTests => "unit-tests",
        FeatureTests => "feature-tests",
        Documentation => "documentation",
    }
}

impl StoryType {
    /// Decode the planner's numeric story-type code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(StoryType::Implementation),
            1 => Some(StoryType::UnitTests),
            2 => Some(StoryType::FeatureTests),
            3 => Some(StoryType::Documentation),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            StoryType::Implementation => 0,
            StoryType::UnitTests => 1,
            StoryType::FeatureTests => 2,
            StoryType::Documentation => 3,
        }
    }
}

/// Lifecycle status of a developer story. Transitions are enforced
/// centrally in [`crate::transitions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    Pending,
    Blocked,
    Ready,
    InProgress,
    Completed,
    Error,
}

crate::simple_display! {
    StoryStatus {
        Pending => "pending",
        Blocked => "blocked",
        Ready => "ready",
        InProgress => "in-progress",
        Completed => "completed",
        Error => "error",
    }
}

impl StoryStatus {
    /// Completed stories accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StoryStatus::Completed)
    }
}

/// Configuration for creating a new story during refinement.
#[derive(Debug, Clone)]
pub struct StoryConfig {
    pub work_item_id: WorkItemId,
    pub story_type: StoryType,
    pub title: String,
    pub description: String,
    pub instructions: String,
    pub priority: u8,
}

impl StoryConfig {
    pub fn new(work_item_id: WorkItemId, story_type: StoryType) -> Self {
        Self {
            work_item_id,
            story_type,
            title: String::new(),
            description: String::new(),
            instructions: String::new(),
            priority: DEFAULT_STORY_PRIORITY,
        }
    }

    crate::setters! {
        into {
            title: String,
            description: String,
            instructions: String,
        }
        set {
            priority: u8,
        }
    }
}

/// A machine-actionable developer story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperStory {
    pub id: StoryId,
    pub work_item_id: WorkItemId,
    pub story_type: StoryType,
    pub title: String,
    pub description: String,
    /// Free-form instruction block handed to the executor verbatim.
    pub instructions: String,
    pub priority: u8,
    pub status: StoryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Stamped when the story is claimed; crash recovery resets stories
    /// whose heartbeat went stale while `InProgress`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Opaque executor conversation token for session continuation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeveloperStory {
    /// Create an unsaved story (id assigned by the store) in `Pending`.
    pub fn new(config: StoryConfig, clock: &impl Clock) -> Self {
        let now = clock.now();
        Self {
            id: StoryId::default(),
            work_item_id: config.work_item_id,
            story_type: config.story_type,
            title: config.title,
            description: config.description,
            instructions: config.instructions,
            priority: config.priority,
            status: StoryStatus::Pending,
            started_at: None,
            completed_at: None,
            heartbeat_at: None,
            error_message: None,
            session_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`, keeping it monotonically ≥ `created_at`.
    pub fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.now().max(self.created_at);
    }
}

crate::builder! {
    pub struct StoryBuilder => DeveloperStory {
        into {
            title: String = "test story",
            description: String = "test story description",
            instructions: String = "do the thing",
        }
        set {
            id: StoryId = StoryId::default(),
            work_item_id: WorkItemId = WorkItemId::new(1),
            story_type: StoryType = StoryType::Implementation,
            priority: u8 = DEFAULT_STORY_PRIORITY,
            status: StoryStatus = StoryStatus::Pending,
        }
        option {
            started_at: DateTime<Utc> = None,
            completed_at: DateTime<Utc> = None,
            heartbeat_at: DateTime<Utc> = None,
            error_message: String = None,
            session_id: String = None,
        }
        computed {
            created_at: DateTime<Utc> = crate::clock::FakeClock::new().now(),
            updated_at: DateTime<Utc> = crate::clock::FakeClock::new().now(),
        }
    }
}

#[cfg(test)]
#[path = "story_tests.rs"]
mod tests;
