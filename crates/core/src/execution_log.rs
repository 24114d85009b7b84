// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only execution log for developer stories.

use crate::clock::Clock;
use crate::id::{LogId, StoryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEvent {
    Started,
    Completed,
    Failed,
    Retried,
    BranchCreated,
    WorktreeCreated,
    WorktreeRemoved,
    Info,
}

crate::simple_display! {
    LogEvent {
        Started => "started",
        Completed => "completed",
        Failed => "failed",
        Retried => "retried",
        BranchCreated => "branch-created",
        WorktreeCreated => "worktree-created",
        WorktreeRemoved => "worktree-removed",
        Info => "info",
    }
}

/// One log entry. Entries are append-only; they are never updated and only
/// removed when their work item is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub id: LogId,
    pub story_id: StoryId,
    pub timestamp: DateTime<Utc>,
    pub event: LogEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Opaque structured payload: duration, exit code, branch, commit ref…
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ExecutionLog {
    pub fn new(story_id: StoryId, event: LogEvent, clock: &impl Clock) -> Self {
        Self {
            id: LogId::default(),
            story_id,
            timestamp: clock.now(),
            event,
            details: None,
            error_message: None,
            metadata: None,
        }
    }

    crate::setters! {
        option {
            details: String,
            error_message: String,
            metadata: serde_json::Value,
        }
    }
}

#[cfg(test)]
#[path = "execution_log_tests.rs"]
mod tests;
