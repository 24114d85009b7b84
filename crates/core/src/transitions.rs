// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Central status transition matrix for work items and stories.
//!
//! Every status change in the system goes through [`apply_work_item_transition`]
//! or [`apply_story_transition`]; nothing else mutates a `status` field.
//! Keeping the matrix in one place stops the CLI, orchestrator, and
//! scheduler from drifting apart on what is legal.

use crate::clock::Clock;
use crate::story::{DeveloperStory, StoryStatus};
use crate::work_item::{WorkItem, WorkItemStatus};
use thiserror::Error;

/// Rejected status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("illegal work item transition: {from} -> {to}")]
    WorkItem { from: WorkItemStatus, to: WorkItemStatus },
    #[error("illegal story transition: {from} -> {to}")]
    Story { from: StoryStatus, to: StoryStatus },
}

/// Legal successor states for a work item status.
pub fn work_item_transitions(from: WorkItemStatus) -> &'static [WorkItemStatus] {
    use WorkItemStatus::*;
    match from {
        Pending => &[Refining, Error],
        Refining => &[Refined, Error],
        Refined => &[InProgress, Error],
        InProgress => &[Completed, Error],
        // Explicit operator retry
        Error => &[Pending],
        Completed => &[],
    }
}

/// Legal successor states for a story status.
pub fn story_transitions(from: StoryStatus) -> &'static [StoryStatus] {
    use StoryStatus::*;
    match from {
        Pending => &[Ready, Blocked, Error],
        Blocked => &[Ready, Error],
        Ready => &[InProgress, Blocked, Error],
        InProgress => &[Completed, Error, Blocked],
        // Explicit operator retry
        Error => &[Pending, Ready],
        Completed => &[],
    }
}

pub fn can_transition_work_item(from: WorkItemStatus, to: WorkItemStatus) -> bool {
    work_item_transitions(from).contains(&to)
}

pub fn can_transition_story(from: StoryStatus, to: StoryStatus) -> bool {
    story_transitions(from).contains(&to)
}

/// Apply a work item transition, refreshing `updated_at`.
///
/// Retry back to `Pending` clears the retained error message.
pub fn apply_work_item_transition(
    item: &mut WorkItem,
    to: WorkItemStatus,
    clock: &impl Clock,
) -> Result<(), TransitionError> {
    if !can_transition_work_item(item.status, to) {
        return Err(TransitionError::WorkItem { from: item.status, to });
    }
    if to == WorkItemStatus::Pending {
        item.error_message = None;
    }
    item.status = to;
    item.touch(clock);
    Ok(())
}

/// Apply a story transition with its timestamp side effects.
///
/// - `started_at` is stamped on first entry to `InProgress` (and the
///   heartbeat refreshed on every entry);
/// - `completed_at` on entry to `Completed`;
/// - retry transitions back to `Pending`/`Ready` clear timestamps, the
///   heartbeat, and the retained error message.
pub fn apply_story_transition(
    story: &mut DeveloperStory,
    to: StoryStatus,
    clock: &impl Clock,
) -> Result<(), TransitionError> {
    if !can_transition_story(story.status, to) {
        return Err(TransitionError::Story { from: story.status, to });
    }
    let retrying = story.status == StoryStatus::Error;
    match to {
        StoryStatus::InProgress => {
            let now = clock.now();
            if story.started_at.is_none() {
                story.started_at = Some(now);
            }
            story.heartbeat_at = Some(now);
        }
        StoryStatus::Completed => {
            story.completed_at = Some(clock.now());
        }
        StoryStatus::Pending | StoryStatus::Ready if retrying => {
            story.started_at = None;
            story.completed_at = None;
            story.heartbeat_at = None;
            story.error_message = None;
        }
        _ => {}
    }
    story.status = to;
    story.touch(clock);
    Ok(())
}

#[cfg(test)]
#[path = "transitions_tests.rs"]
mod tests;
