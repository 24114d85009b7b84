// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work items: operator-submitted coarse units of work.

use crate::clock::Clock;
use crate::id::WorkItemId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum title length in characters.
pub const TITLE_MAX: usize = 500;

/// Maximum description length in characters.
pub const DESCRIPTION_MAX: usize = 4000;

/// Priority bounds; 1 is most urgent.
pub const PRIORITY_MIN: u8 = 1;
pub const PRIORITY_MAX: u8 = 9;

/// Kind of work item submitted by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemKind {
    UserStory,
    Bug,
}

crate::simple_display! {
    WorkItemKind {
        UserStory => "user-story",
        Bug => "bug",
    }
}

impl std::str::FromStr for WorkItemKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user-story" | "user_story" | "story" => Ok(WorkItemKind::UserStory),
            "bug" => Ok(WorkItemKind::Bug),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

/// Lifecycle status of a work item. Transitions are enforced centrally in
/// [`crate::transitions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    Pending,
    Refining,
    Refined,
    InProgress,
    Completed,
    Error,
}

crate::simple_display! {
    WorkItemStatus {
        Pending => "pending",
        Refining => "refining",
        Refined => "refined",
        InProgress => "in-progress",
        Completed => "completed",
        Error => "error",
    }
}

impl WorkItemStatus {
    /// Completed work items accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkItemStatus::Completed)
    }
}

/// Invalid operator input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("title exceeds {TITLE_MAX} characters (got {0})")]
    TitleTooLong(usize),
    #[error("description must not be empty")]
    EmptyDescription,
    #[error("description exceeds {DESCRIPTION_MAX} characters (got {0})")]
    DescriptionTooLong(usize),
    #[error("priority must be within {PRIORITY_MIN}..={PRIORITY_MAX} (got {0})")]
    PriorityOutOfRange(u8),
    #[error("unknown work item kind: {0:?}")]
    UnknownKind(String),
}

/// Input for creating a work item. Validated before persisting.
#[derive(Debug, Clone)]
pub struct NewWorkItem {
    pub kind: WorkItemKind,
    pub title: String,
    pub description: String,
    pub acceptance_criteria: Option<String>,
    pub priority: u8,
}

impl NewWorkItem {
    pub fn new(kind: WorkItemKind, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: description.into(),
            acceptance_criteria: None,
            priority: 5,
        }
    }

    crate::setters! {
        set {
            priority: u8,
        }
        option {
            acceptance_criteria: String,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.title.chars().count() > TITLE_MAX {
            return Err(ValidationError::TitleTooLong(self.title.chars().count()));
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        if self.description.chars().count() > DESCRIPTION_MAX {
            return Err(ValidationError::DescriptionTooLong(self.description.chars().count()));
        }
        if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&self.priority) {
            return Err(ValidationError::PriorityOutOfRange(self.priority));
        }
        Ok(())
    }

    /// Validate and build an unsaved work item (id assigned by the store).
    pub fn build(self, clock: &impl Clock) -> Result<WorkItem, ValidationError> {
        self.validate()?;
        let now = clock.now();
        Ok(WorkItem {
            id: WorkItemId::default(),
            kind: self.kind,
            title: self.title,
            description: self.description,
            acceptance_criteria: self.acceptance_criteria,
            priority: self.priority,
            status: WorkItemStatus::Pending,
            error_message: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// An operator-submitted work item, decomposed into developer stories by
/// refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub kind: WorkItemKind,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<String>,
    pub priority: u8,
    pub status: WorkItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    /// Refresh `updated_at`, keeping it monotonically ≥ `created_at`.
    pub fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.now().max(self.created_at);
    }
}

crate::builder! {
    pub struct WorkItemBuilder => WorkItem {
        into {
            title: String = "test item",
            description: String = "test description",
        }
        set {
            id: WorkItemId = WorkItemId::default(),
            kind: WorkItemKind = WorkItemKind::UserStory,
            priority: u8 = 5,
            status: WorkItemStatus = WorkItemStatus::Pending,
        }
        option {
            acceptance_criteria: String = None,
            error_message: String = None,
        }
        computed {
            created_at: DateTime<Utc> = crate::clock::FakeClock::new().now(),
            updated_at: DateTime<Utc> = crate::clock::FakeClock::new().now(),
        }
    }
}

#[cfg(test)]
#[path = "work_item_tests.rs"]
mod tests;
