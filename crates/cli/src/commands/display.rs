// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text rendering and status parsing for command output.

use anyhow::bail;
use fm_core::{DeveloperStory, StoryStatus, WorkItem, WorkItemStatus};

pub fn work_item_line(item: &WorkItem) -> String {
    format!(
        "#{} [{}] {} \"{}\" (priority {})",
        item.id, item.status, item.kind, item.title, item.priority
    )
}

pub fn story_line(story: &DeveloperStory) -> String {
    let mut line = format!(
        "story {} [{}] {} \"{}\" (work item {}, priority {})",
        story.id, story.status, story.story_type, story.title, story.work_item_id, story.priority
    );
    if let Some(error) = &story.error_message {
        line.push_str(&format!(" error: {}", error));
    }
    line
}

/// Accepts display ("in-progress") and snake ("in_progress") spellings.
pub fn parse_story_status(s: &str) -> anyhow::Result<StoryStatus> {
    Ok(match s.replace('_', "-").as_str() {
        "pending" => StoryStatus::Pending,
        "blocked" => StoryStatus::Blocked,
        "ready" => StoryStatus::Ready,
        "in-progress" => StoryStatus::InProgress,
        "completed" => StoryStatus::Completed,
        "error" => StoryStatus::Error,
        other => bail!("unknown story status: {:?}", other),
    })
}

pub fn parse_work_item_status(s: &str) -> anyhow::Result<WorkItemStatus> {
    Ok(match s.replace('_', "-").as_str() {
        "pending" => WorkItemStatus::Pending,
        "refining" => WorkItemStatus::Refining,
        "refined" => WorkItemStatus::Refined,
        "in-progress" => WorkItemStatus::InProgress,
        "completed" => WorkItemStatus::Completed,
        "error" => WorkItemStatus::Error,
        other => bail!("unknown work item status: {:?}", other),
    })
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
